pub mod diffusers_client;
pub mod openai_client;

pub use diffusers_client::DiffusersClient;
pub use openai_client::OpenAiClient;

use crate::{
    config::ClientConfig,
    error::{KitError, Result},
};
use reqwest::{Method, RequestBuilder, StatusCode};
use std::time::Duration;

pub const STATUS_PATH: &str = "/api/status";
pub const INFERENCE_PATH: &str = "/api/diffusers/inference";
pub const MODELS_PATH: &str = "/v1/models";
pub const GENERATIONS_PATH: &str = "/v1/images/generations";
pub const DOWNLOAD: &str = "image download";

pub const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
pub const INFERENCE_TIMEOUT: Duration = Duration::from_secs(120);
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared plumbing: base URL, optional bearer key and status checking.
#[derive(Clone)]
pub(crate) struct Transport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Transport {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path)).timeout(timeout);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Sends the request and turns anything but 200 into [`KitError::Status`].
    pub(crate) async fn send(
        &self,
        endpoint: &'static str,
        builder: RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(KitError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Client for a running Diffusers server, covering both its native and its
/// OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct ServerClient {
    transport: Transport,
    diffusers_client: DiffusersClient,
    openai_client: OpenAiClient,
}

impl ServerClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let transport = Transport {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        };

        Ok(Self {
            diffusers_client: DiffusersClient::new(transport.clone()),
            openai_client: OpenAiClient::new(transport.clone()),
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }

    pub fn diffusers(&self) -> &DiffusersClient {
        &self.diffusers_client
    }

    pub fn openai(&self) -> &OpenAiClient {
        &self.openai_client
    }

    /// `GET /api/status`; Ok only for a 200.
    pub async fn status(&self, timeout: Duration) -> Result<()> {
        let request = self.transport.request(Method::GET, STATUS_PATH, timeout);
        self.transport.send(STATUS_PATH, request).await?;
        Ok(())
    }

    /// Fetches an absolute URL, typically a link returned by a generation call.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let request = self.transport.client.get(url).timeout(DOWNLOAD_TIMEOUT);
        let response = self.transport.send(DOWNLOAD, request).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
