use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors surfaced by the tutorial pipeline and mapped onto HTTP statuses by the API.
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("Model endpoint unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Model endpoint did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Model output could not be parsed: {0}")]
    MalformedModelOutput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to extract transcript: {0}")]
    TranscriptUnavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TutorError>;

impl TutorError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UpstreamUnavailable(_) | Self::UpstreamTimeout(_) => StatusCode::BAD_GATEWAY,
            Self::MalformedModelOutput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Validation(_) | Self::TranscriptUnavailable(_) => StatusCode::BAD_REQUEST,
            Self::Json(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TutorError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, "request failed: {}", self);
        } else {
            tracing::warn!(%status, "request rejected: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TutorError::UpstreamUnavailable("down".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            TutorError::UpstreamTimeout(Duration::from_secs(30)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            TutorError::MalformedModelOutput("nope".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            TutorError::Validation("empty".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TutorError::TranscriptUnavailable("no captions".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
