//! API error handling
//!
//! Every failure renders as `{ "error": "..." }`. Internal details are logged
//! and never sent to the caller.
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::FolioError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message
    #[schema(example = "Invalid request")]
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// No chat-completion credential configured
    MissingCredential,
    /// No usable user message in the request
    InvalidRequest,
    /// Every fallback model failed
    Unavailable,
    /// A model call exceeded its deadline
    Timeout,
    /// The photo directory could not be read
    PhotoScan(String),
    /// Anything else
    Internal(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::MissingCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server missing OPENAI_API_KEY",
            ),
            AppError::InvalidRequest => (StatusCode::BAD_REQUEST, "Invalid request"),
            AppError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "All available models are currently unavailable. Please try again later.",
            ),
            AppError::Timeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                "The assistant took too long to respond. Please try again later.",
            ),
            AppError::PhotoScan(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to scan photography directory",
            ),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(detail) => tracing::error!("Unexpected error: {}", detail),
            AppError::PhotoScan(detail) => {
                tracing::error!("Error scanning photography directory: {}", detail)
            }
            _ => {}
        }

        let (status, message) = self.status_and_message();
        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<FolioError> for AppError {
    fn from(err: FolioError) -> Self {
        match err {
            FolioError::ValidationError(_) => AppError::InvalidRequest,
            FolioError::ModelsExhausted(_) => AppError::Unavailable,
            FolioError::Timeout { .. } => AppError::Timeout,
            other => AppError::Internal(other.to_string()),
        }
    }
}
