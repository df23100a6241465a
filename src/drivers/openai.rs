use super::{save_first, DEFAULT_PROMPT, DEFAULT_REQUEST_SIZE};
use crate::{
    client::ServerClient,
    error::Result,
    launcher::{self, LaunchConfig},
    logger,
    models::{ImageGenerationRequest, ResponseFormat},
};
use std::path::PathBuf;

/// Exercises `/v1/models` and `/v1/images/generations` with plain JSON calls.
#[derive(Debug, Clone)]
pub struct OpenAiSmokeTest {
    pub prompt: String,
    pub size: String,
    pub n: u32,
    pub response_format: ResponseFormat,
    pub output: PathBuf,
    /// Start the server as a child process before testing.
    pub launch: Option<LaunchConfig>,
}

impl Default for OpenAiSmokeTest {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            size: DEFAULT_REQUEST_SIZE.to_string(),
            n: 1,
            response_format: ResponseFormat::Url,
            output: PathBuf::from("openai_test.png"),
            launch: None,
        }
    }
}

impl OpenAiSmokeTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) -> ImageGenerationRequest {
        ImageGenerationRequest::new(self.prompt.clone())
            .with_size(self.size.clone())
            .with_n(self.n)
            .with_response_format(self.response_format)
    }

    /// Runs the test and returns the path the first image was saved to.
    ///
    /// A server started for the run is stopped before returning, on success or failure.
    pub async fn run(&self, client: &ServerClient) -> Result<PathBuf> {
        let mut server = match &self.launch {
            Some(config) => Some(launcher::launch(config, client).await?),
            None => None,
        };

        let result = self.exercise(client).await;
        if let Some(server) = server.as_mut() {
            server.stop().await;
        }
        result
    }

    async fn exercise(&self, client: &ServerClient) -> Result<PathBuf> {
        let models = client.openai().list_models().await?;
        log::info!("/v1/models: 200 ({} models)", models.data.len());

        let response = {
            let _timer = logger::timer("/v1/images/generations");
            client.openai().generate(&self.request()).await?
        };
        log::info!("/v1/images/generations: 200");

        save_first(client, &response, self.response_format, &self.output).await?;

        Ok(self.output.clone())
    }
}
