use crate::error::Result;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use std::io::Write;

/// Writes `image` as an optimized PNG (best compression, adaptive filtering).
pub fn write_png<W: Write>(image: &DynamicImage, writer: W) -> Result<()> {
    let encoder = PngEncoder::new_with_quality(writer, CompressionType::Best, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;
    Ok(())
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_png(image, &mut buf)?;
    Ok(buf)
}

/// Checks the eight-byte PNG signature.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'])
}
