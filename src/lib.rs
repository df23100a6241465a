pub mod client;
pub mod config;
pub mod drivers;
pub mod error;
pub mod launcher;
pub mod logger;
pub mod media;
pub mod models;
#[cfg(feature = "server")]
pub mod server;

pub use client::{DiffusersClient, OpenAiClient, ServerClient};
pub use config::{ClientConfig, ServiceConfig};
pub use error::{KitError, Result};
pub use media::{ImageSource, MediaStore, PixelTensor};
pub use models::*;
