use super::{Transport, GENERATIONS_PATH, GENERATION_TIMEOUT, MODELS_PATH};
use crate::{
    error::Result,
    models::{ImageGenerationRequest, ImageGenerationResponse, ModelList},
};
use reqwest::Method;

/// Raw-JSON access to the OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    transport: Transport,
}

impl OpenAiClient {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub async fn list_models(&self) -> Result<ModelList> {
        let builder = self
            .transport
            .request(Method::GET, MODELS_PATH, GENERATION_TIMEOUT);
        let response = self.transport.send(MODELS_PATH, builder).await?;
        Ok(response.json().await?)
    }

    pub async fn generate(&self, request: &ImageGenerationRequest) -> Result<ImageGenerationResponse> {
        log::info!(
            "Generating {} image(s) at {} as {}",
            request.n,
            request.size,
            request.response_format
        );

        let builder = self
            .transport
            .request(Method::POST, GENERATIONS_PATH, GENERATION_TIMEOUT)
            .json(request);
        let response = self.transport.send(GENERATIONS_PATH, builder).await?;
        Ok(response.json().await?)
    }
}
