use serde::{Deserialize, Serialize};

pub const DEMO_PROMPT: &str = "A cute anime cat running through a cyberpunk city at night";

/// Body of `POST /api/diffusers/inference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub num_inference_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sequence_length: Option<u32>,
    pub num_images_per_prompt: u32,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: None,
            num_inference_steps: 20,
            guidance_scale: None,
            max_sequence_length: None,
            num_images_per_prompt: 1,
        }
    }

    /// Distilled Flux schnell: few steps and no classifier-free guidance.
    pub fn flux(prompt: impl Into<String>) -> Self {
        Self {
            num_inference_steps: 4,
            guidance_scale: Some(0.0),
            max_sequence_length: Some(256),
            ..Self::new(prompt)
        }
    }

    pub fn sd3(prompt: impl Into<String>) -> Self {
        Self {
            negative_prompt: Some("blurry, low quality".to_string()),
            num_inference_steps: 20,
            ..Self::new(prompt)
        }
    }
}

/// Body returned by the diffusers endpoint: links to the stored images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub response: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flux_payload() {
        let payload = serde_json::to_value(InferenceRequest::flux(DEMO_PROMPT)).unwrap();
        assert_eq!(
            payload,
            json!({
                "prompt": DEMO_PROMPT,
                "num_inference_steps": 4,
                "guidance_scale": 0.0,
                "max_sequence_length": 256,
                "num_images_per_prompt": 1
            })
        );
    }

    #[test]
    fn test_sd3_payload_omits_flux_fields() {
        let payload = serde_json::to_value(InferenceRequest::sd3(DEMO_PROMPT)).unwrap();
        assert_eq!(payload["negative_prompt"], "blurry, low quality");
        assert_eq!(payload["num_inference_steps"], 20);
        assert!(payload.get("guidance_scale").is_none());
        assert!(payload.get("max_sequence_length").is_none());
    }

    #[test]
    fn test_response_without_field() {
        let parsed: InferenceResponse = serde_json::from_str(r#"{"detail": "oops"}"#).unwrap();
        assert!(parsed.response.is_none());
    }
}
