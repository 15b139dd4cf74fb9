//! HTTP error type for the API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use slr_common::SlrError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown job or article (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Criteria that cannot produce a run (422)
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    /// Job is not in a state that allows the request (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream literature source failed (502)
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<SlrError> for ApiError {
    fn from(err: SlrError) -> Self {
        match err {
            SlrError::InvalidCriteria(msg) => ApiError::InvalidCriteria(msg),
            SlrError::SourceUnavailable(msg) => ApiError::Upstream(msg),
            SlrError::Http(e) => ApiError::Upstream(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidCriteria(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_CRITERIA"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slr_errors_map_to_status() {
        let cases = [
            (SlrError::InvalidCriteria("empty disease".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (SlrError::SourceUnavailable("esearch 503".into()), StatusCode::BAD_GATEWAY),
            (SlrError::SinkWrite("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
