use super::{save_first, DEFAULT_PROMPT, DEFAULT_REQUEST_SIZE};
use crate::{
    client::ServerClient,
    config::ClientConfig,
    error::Result,
    logger,
    models::{
        ImageGenerationRequest, ImageGenerationResponse, ModelList, ResponseFormat, DEFAULT_MODEL,
    },
};
use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8500/v1";
pub const DEFAULT_API_KEY: &str = "not-needed";

/// Same checks as the raw-HTTP test, issued through the `async-openai` client.
///
/// Requests and responses use the crate's own DTOs, so any "WxH" size is sent
/// as-is and a response without `created` is accepted.
#[derive(Debug, Clone)]
pub struct SdkSmokeTest {
    pub prompt: String,
    pub size: String,
    pub n: u32,
    pub response_format: ResponseFormat,
    pub model: String,
    pub output: PathBuf,
    pub base_url: String,
    pub api_key: String,
}

impl Default for SdkSmokeTest {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            size: DEFAULT_REQUEST_SIZE.to_string(),
            n: 1,
            response_format: ResponseFormat::Url,
            model: DEFAULT_MODEL.to_string(),
            output: PathBuf::from("openai_sdk.png"),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

impl SdkSmokeTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) -> ImageGenerationRequest {
        ImageGenerationRequest::new(self.prompt.clone())
            .with_model(self.model.clone())
            .with_size(self.size.clone())
            .with_n(self.n)
            .with_response_format(self.response_format)
    }

    pub async fn run(&self) -> Result<PathBuf> {
        let config = OpenAIConfig::new()
            .with_api_base(self.base_url.trim_end_matches('/'))
            .with_api_key(&self.api_key);
        let client = Client::with_config(config);

        let models: std::result::Result<ModelList, OpenAIError> = client.models().list_byot().await;
        match models {
            Ok(models) => log::info!("/v1/models -> {} models", models.data.len()),
            Err(e) => log::warn!("⚠️  models.list() failed: {}", e),
        }

        let response: std::result::Result<ImageGenerationResponse, OpenAIError> = {
            let _timer = logger::timer("images.generate");
            client.images().create_byot(self.request()).await
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::error!("❌ images.generate failed: {}", e);
                return Err(e.into());
            }
        };

        // Links point at the server root, not at the `/v1` API base.
        let fetcher = ServerClient::new(ClientConfig::new().with_base_url(&self.base_url))?;
        save_first(&fetcher, &response, self.response_format, &self.output).await?;

        Ok(self.output.clone())
    }
}
