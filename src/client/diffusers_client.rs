use super::{Transport, INFERENCE_PATH, INFERENCE_TIMEOUT};
use crate::{
    error::{KitError, Result},
    models::{InferenceRequest, InferenceResponse},
};
use reqwest::Method;

#[derive(Clone)]
pub struct DiffusersClient {
    transport: Transport,
}

impl DiffusersClient {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Runs one inference call and returns the links to the generated images.
    pub async fn infer(&self, request: &InferenceRequest) -> Result<Vec<String>> {
        log::info!(
            "Requesting {} image(s) with {} steps",
            request.num_images_per_prompt,
            request.num_inference_steps
        );

        let builder = self
            .transport
            .request(Method::POST, INFERENCE_PATH, INFERENCE_TIMEOUT)
            .json(request);
        let response = self.transport.send(INFERENCE_PATH, builder).await?;
        let body: InferenceResponse = response.json().await?;

        body.response.ok_or(KitError::MissingField("response"))
    }
}
