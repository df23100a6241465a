use thiserror::Error;

#[derive(Debug, Error)]
pub enum KitError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to start server: {0}")]
    Spawn(String),

    #[error("Server did not become ready: {0}")]
    Startup(String),

    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("No data returned")]
    EmptyData,

    #[error("No {0} in response")]
    MissingField(&'static str),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("SDK error: {0}")]
    Sdk(#[from] async_openai::error::OpenAIError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Tensor error: {0}")]
    Tensor(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for KitError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            KitError::Unreachable(e.to_string())
        } else {
            KitError::Http(e)
        }
    }
}

impl KitError {
    /// Process exit code for the failure class this error belongs to.
    pub fn exit_code(&self) -> u8 {
        match self {
            KitError::Unreachable(_) | KitError::Spawn(_) | KitError::Startup(_) => 1,
            KitError::Status { endpoint, .. } if *endpoint == crate::client::STATUS_PATH => 1,
            KitError::Status { endpoint, .. } if *endpoint == crate::client::MODELS_PATH => 2,
            KitError::Status { .. } | KitError::Sdk(_) => 3,
            KitError::EmptyData => 4,
            KitError::MissingField(_) => 5,
            _ => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, KitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_per_failure_class() {
        assert_eq!(KitError::Unreachable("refused".into()).exit_code(), 1);
        assert_eq!(KitError::Startup("50 attempts".into()).exit_code(), 1);
        assert_eq!(KitError::Spawn("no such file".into()).exit_code(), 1);
        let status = KitError::Status {
            endpoint: crate::client::STATUS_PATH,
            status: 503,
            body: String::new(),
        };
        assert_eq!(status.exit_code(), 1);
        let models = KitError::Status {
            endpoint: crate::client::MODELS_PATH,
            status: 500,
            body: String::new(),
        };
        assert_eq!(models.exit_code(), 2);
        let generation = KitError::Status {
            endpoint: crate::client::GENERATIONS_PATH,
            status: 422,
            body: "bad".into(),
        };
        assert_eq!(generation.exit_code(), 3);
        assert_eq!(KitError::EmptyData.exit_code(), 4);
        assert_eq!(KitError::MissingField("b64_json").exit_code(), 5);
        assert_eq!(KitError::ConfigError("size".into()).exit_code(), 6);
    }

    #[test]
    fn test_status_display() {
        let err = KitError::Status {
            endpoint: "/api/status",
            status: 503,
            body: "loading".into(),
        };
        assert_eq!(err.to_string(), "/api/status returned status 503: loading");
    }
}
