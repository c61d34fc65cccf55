//! AiClient - Image Analysis Service Adapter
//!
//! ## Responsibilities
//!
//! - Send generate requests to the analysis service (Ollama-style API)
//! - Classify transport and protocol failures
//! - Enforce the request deadline
//!
//! Failures come back as [`AnalysisError`] values so the pipeline can turn
//! them into displayable record text instead of aborting a capture loop.

use crate::error::AnalysisError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Analysis service client
pub struct AiClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

/// Generate request body
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    file: &'a str,
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
}

/// Generate response body; `response` is the answer text
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

impl AiClient {
    /// Create a client with the default 30 s deadline
    pub fn new(endpoint: String) -> Self {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom deadline
    pub fn with_timeout(endpoint: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint,
            timeout,
        }
    }

    /// Ask the service to describe one JPEG image.
    ///
    /// `file` is the snapshot filename reported alongside the image so the
    /// service can label its own logs.
    pub async fn generate(
        &self,
        file: &str,
        model: &str,
        prompt: &str,
        image_jpeg: &[u8],
    ) -> Result<String, AnalysisError> {
        let body = GenerateRequest {
            file,
            model,
            prompt,
            images: vec![base64::engine::general_purpose::STANDARD.encode(image_jpeg)],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AnalysisError::HttpError(status.as_u16()));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        parsed.response.ok_or_else(|| {
            AnalysisError::MalformedResponse("missing 'response' field".to_string())
        })
    }

    /// Whether the service host answers at all
    pub async fn health_check(&self) -> bool {
        match self.client.get(&self.endpoint).send().await {
            Ok(_) => true,
            Err(e) => !(e.is_connect() || e.is_timeout()),
        }
    }

    /// Configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn classify_transport_error(e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::Timeout
    } else if e.is_connect() {
        AnalysisError::ConnectionFailed(e.to_string())
    } else if let Some(status) = e.status() {
        AnalysisError::HttpError(status.as_u16())
    } else {
        AnalysisError::ConnectionFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            file: "snapshot_20260825_143005_042.jpg",
            model: "llava",
            prompt: "What is in this picture?",
            images: vec!["aGVsbG8=".to_string()],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["file"], "snapshot_20260825_143005_042.jpg");
        assert_eq!(json["model"], "llava");
        assert_eq!(json["prompt"], "What is in this picture?");
        assert_eq!(json["images"][0], "aGVsbG8=");
    }

    #[test]
    fn response_field_is_optional_in_schema() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"model":"llava","done":true}"#).unwrap();
        assert!(parsed.response.is_none());

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"response":"a cat"}"#).unwrap();
        assert_eq!(parsed.response.as_deref(), Some("a cat"));
    }
}
