//! The three smoke tests: native diffusers endpoint, OpenAI-compatible
//! endpoints over raw HTTP, and the same endpoints through the OpenAI SDK.

pub mod diffusers;
pub mod openai;
pub mod openai_sdk;

use crate::{
    client::ServerClient,
    error::{KitError, Result},
    media::png,
    models::{ImageGenerationResponse, ResponseFormat},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::path::Path;

pub const DEFAULT_PROMPT: &str = "a small red boat on a lake, minimalism";
pub const DEFAULT_REQUEST_SIZE: &str = "256x256";

/// Saves the first item of a generation response in the requested format.
///
/// An absent or empty `url`/`b64_json` is a [`KitError::MissingField`].
pub async fn save_first(
    client: &ServerClient,
    response: &ImageGenerationResponse,
    format: ResponseFormat,
    output: &Path,
) -> Result<()> {
    let item = response.data.first().ok_or(KitError::EmptyData)?;
    match format {
        ResponseFormat::Url => {
            let url = non_empty(item.url.as_deref()).ok_or(KitError::MissingField("url"))?;
            save_url(client, url, output).await
        }
        ResponseFormat::B64Json => {
            let b64 =
                non_empty(item.b64_json.as_deref()).ok_or(KitError::MissingField("b64_json"))?;
            save_b64(b64, output)
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Downloads a returned image link and writes it to `output`.
pub async fn save_url(client: &ServerClient, url: &str, output: &Path) -> Result<()> {
    log::info!("image url: {}", url);
    let bytes = client.download(url).await?;
    write_output(output, &bytes)
}

/// Decodes an inline `b64_json` payload and writes it to `output`.
pub fn save_b64(b64: &str, output: &Path) -> Result<()> {
    let bytes = STANDARD.decode(b64)?;
    write_output(output, &bytes)
}

fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    if !png::is_png(bytes) {
        log::warn!("⚠️  Payload for {} is not a PNG", output.display());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, bytes)?;
    log::info!("💾 saved: {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}
