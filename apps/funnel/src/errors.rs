use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::scoring::ScoringError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ProfileNotFound(_)
            | PipelineError::BatchNotFound(_)
            | PipelineError::CandidateNotFound(_) => AppError::NotFound(err.to_string()),
            PipelineError::InvalidProfile(_)
            | PipelineError::InvalidUpload(_)
            | PipelineError::EmptyBatch => AppError::Validation(err.to_string()),
            PipelineError::ProfileExists(_) | PipelineError::BatchHalted(_) => {
                AppError::Conflict(err.to_string())
            }
            PipelineError::QueueUnavailable(_) => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The job queue is unavailable; try again later".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_pipeline_errors_map_to_status_codes() {
        let status = |e: PipelineError| AppError::from(e).into_response().status();
        assert_eq!(status(PipelineError::BatchNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status(PipelineError::EmptyBatch), StatusCode::BAD_REQUEST);
        assert_eq!(status(PipelineError::BatchHalted(Uuid::nil())), StatusCode::CONFLICT);
        assert_eq!(
            status(PipelineError::QueueUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
