use super::save_url;
use crate::{
    client::{ServerClient, STATUS_TIMEOUT},
    error::Result,
    logger,
    models::{InferenceRequest, DEMO_PROMPT},
};
use std::path::PathBuf;

/// Which pipeline the server is expected to be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Flux,
    Sd3,
}

impl Preset {
    pub fn label(&self) -> &'static str {
        match self {
            Preset::Flux => "Flux",
            Preset::Sd3 => "SD3",
        }
    }

    pub fn request(&self) -> InferenceRequest {
        match self {
            Preset::Flux => InferenceRequest::flux(DEMO_PROMPT),
            Preset::Sd3 => InferenceRequest::sd3(DEMO_PROMPT),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiffusersSmokeTest {
    pub preset: Preset,
    /// Download every returned image into this directory.
    pub save_dir: Option<PathBuf>,
}

impl DiffusersSmokeTest {
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            save_dir: None,
        }
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Checks the server, runs one inference call and returns the image links.
    pub async fn run(&self, client: &ServerClient) -> Result<Vec<String>> {
        check_server_status(client).await?;

        let label = self.preset.label();
        let request = self.preset.request();
        log::info!("Testing {} model...", label);
        log::info!("Payload: {}", serde_json::to_string_pretty(&request)?);

        let urls = {
            let _timer = logger::timer(&format!("{} generation", label));
            client.diffusers().infer(&request).await
        };
        let urls = match urls {
            Ok(urls) => urls,
            Err(e) => {
                log::error!("❌ {} generation failed: {}", label, e);
                return Err(e);
            }
        };
        log::info!("✅ {} generation successful!", label);
        log::info!("Generated image URLs: {:?}", urls);

        if let Some(dir) = &self.save_dir {
            for (i, url) in urls.iter().enumerate() {
                save_url(client, url, &dir.join(output_name(url, i))).await?;
            }
        }

        Ok(urls)
    }
}

pub async fn check_server_status(client: &ServerClient) -> Result<()> {
    match client.status(STATUS_TIMEOUT).await {
        Ok(()) => {
            log::info!("✅ Server is running");
            Ok(())
        }
        Err(e) => {
            log::error!("❌ Server not accessible: {}", e);
            log::info!("Please start the server first");
            Err(e)
        }
    }
}

/// Last path segment of the link, or a positional name when it has none.
fn output_name(url: &str, index: usize) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(".."))
        .map(String::from)
        .unwrap_or_else(|| format!("image_{}.png", index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(Preset::default(), Preset::Flux);
        assert_eq!(Preset::Flux.request().num_inference_steps, 4);
        assert_eq!(Preset::Sd3.request().num_inference_steps, 20);
        assert_eq!(Preset::Sd3.label(), "SD3");
    }

    #[test]
    fn test_output_name() {
        assert_eq!(
            output_name("http://127.0.0.1:8500/images/img0badf00d.png", 0),
            "img0badf00d.png"
        );
        assert_eq!(output_name("http://127.0.0.1:8500/images/", 3), "image_3.png");
    }
}
