use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::brief::errors::{BriefError, BriefGenerationFailed};
use crate::documents::fetch::FetchError;
use crate::documents::ExtractError;
use crate::llm_client::CompletionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Brief(#[from] BriefGenerationFailed),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, stage) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Multipart(e) => (e.status(), "INVALID_UPLOAD", e.body_text(), None),
            AppError::Brief(failure) => {
                let (status, code, message) = describe_failure(failure);
                (status, code, message, Some(failure.stage.code()))
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "stage": stage,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Document problems are the caller's to fix, so their message is returned verbatim.
/// Upstream failures are logged in full and summarised for the client.
fn describe_failure(failure: &BriefGenerationFailed) -> (StatusCode, &'static str, String) {
    match &failure.source {
        BriefError::Extract(ExtractError::UnsupportedFormat(_)) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "UNSUPPORTED_FORMAT",
            failure.to_string(),
        ),
        BriefError::Extract(ExtractError::CorruptDocument { .. }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "CORRUPT_DOCUMENT",
            failure.to_string(),
        ),
        BriefError::EmptyInput(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "EMPTY_INPUT",
            failure.to_string(),
        ),
        BriefError::Fetch(FetchError::InvalidUrl(_)) => {
            (StatusCode::BAD_REQUEST, "INVALID_URL", failure.to_string())
        }
        BriefError::Fetch(e) => {
            tracing::error!("JD fetch failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                "FETCH_FAILED",
                "The job description URL could not be fetched".to_string(),
            )
        }
        BriefError::Completion(e) => {
            tracing::error!("Completion failed after {} attempts: {e}", failure.attempts);
            match e {
                CompletionError::Timeout(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "COMPLETION_TIMEOUT",
                    "The AI service did not answer in time".to_string(),
                ),
                CompletionError::RateLimited { .. } | CompletionError::ServiceUnavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "COMPLETION_UNAVAILABLE",
                    "The AI service is temporarily unavailable, please retry later".to_string(),
                ),
                CompletionError::Api { .. } | CompletionError::EmptyContent => (
                    StatusCode::BAD_GATEWAY,
                    "COMPLETION_FAILED",
                    "An AI processing error occurred".to_string(),
                ),
            }
        }
        BriefError::Unparsable(e) => {
            tracing::error!("Unparsable completion output: {:?}", e.excerpt);
            (
                StatusCode::BAD_GATEWAY,
                "UNPARSABLE_RESPONSE",
                "The AI service returned output that could not be read as a brief".to_string(),
            )
        }
    }
}
