//! Shared plumbing for the HTTP model backends.
//!
//! Backends:
//!   HfZeroShotClassifier  — Hugging Face inference API, zero-shot pipeline
//!   EmbeddingClient       — OpenAI, any OpenAI-compatible /v1/embeddings
//!                           endpoint, or local Ollama /api/embeddings

use slr_common::SlrError;
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Request blocked: {0}")]
    Blocked(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<SlrError> for ModelError {
    fn from(e: SlrError) -> Self {
        match e {
            SlrError::Security(msg) => ModelError::Blocked(msg),
            SlrError::Http(e) => ModelError::Http(e),
            other => ModelError::Unavailable(other.to_string()),
        }
    }
}

impl From<ModelError> for SlrError {
    fn from(e: ModelError) -> Self {
        SlrError::LayerEvaluation(e.to_string())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Turn an HTTP response into JSON, mapping error statuses to `ModelError`.
pub(crate) async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, ModelError> {
    let status = resp.status().as_u16();
    if status == 429 {
        return Err(ModelError::RateLimitExceeded);
    }
    let text = resp.text().await?;
    if status >= 400 {
        return Err(ModelError::ApiError { status, message: error_message(&text) });
    }
    Ok(serde_json::from_str(&text)?)
}

/// Pull a readable message out of an error body. Providers disagree on the
/// shape: OpenAI nests it under `error.message`, HF puts a string in `error`.
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return if body.trim().is_empty() { "unknown API error".to_string() } else { body.trim().to_string() };
    };
    json["error"]["message"]
        .as_str()
        .or_else(|| json["error"].as_str())
        .or_else(|| json["message"].as_str())
        .unwrap_or("unknown API error")
        .to_string()
}

/// Read a JSON array of numbers into an f32 vector.
pub(crate) fn as_vector(value: &serde_json::Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"error":{"message":"bad key"}}"#), "bad key");
        assert_eq!(error_message(r#"{"error":"Model is loading"}"#), "Model is loading");
        assert_eq!(error_message(r#"{"message":"nope"}"#), "nope");
        assert_eq!(error_message("Gateway Timeout"), "Gateway Timeout");
        assert_eq!(error_message(""), "unknown API error");
    }

    #[test]
    fn test_as_vector_rejects_non_numbers() {
        assert_eq!(as_vector(&serde_json::json!([0.5, 1])), Some(vec![0.5, 1.0]));
        assert_eq!(as_vector(&serde_json::json!([0.5, "x"])), None);
        assert_eq!(as_vector(&serde_json::json!({})), None);
    }

    #[test]
    fn test_model_error_becomes_layer_failure() {
        let e: SlrError = ModelError::ApiError { status: 503, message: "loading".into() }.into();
        assert!(matches!(e, SlrError::LayerEvaluation(ref m) if m.contains("503")));
    }
}
