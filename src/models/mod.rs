pub mod diffusers;
pub mod openai;

pub use diffusers::*;
pub use openai::*;
