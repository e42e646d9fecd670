//! Error types for stemsplit-server
//!
//! Every failure reaching a handler boundary becomes a flat
//! `{"error": "<message>"}` body. Client faults (400/404) carry a specific
//! message; server faults (500) carry a generic one, with details going to
//! the log only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{DownloadError, MissingOutput, SeparationError, ValidationError};

const PROCESSING_FAILED: &str = "An error occurred during audio processing.";
const UNEXPECTED: &str = "An unexpected server error occurred.";
const SAVE_FAILED: &str = "Failed to save the uploaded file.";
const OUTPUT_MISSING: &str = "Processing failed. Could not find separated files.";
const FILE_NOT_FOUND: &str = "File not found";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, unnamed, disallowed (400) or oversized (413) upload
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Staging write failed (500)
    #[error("Failed to stage upload: {0}")]
    Persistence(#[source] std::io::Error),

    /// Tool missing, failed, timed out or could not be launched (500)
    #[error(transparent)]
    Separation(#[from] SeparationError),

    /// Tool succeeded without producing both stems (500)
    #[error(transparent)]
    MissingOutput(#[from] MissingOutput),

    /// Download target absent or outside the output root (404)
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(ValidationError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Persistence(_) | ApiError::Separation(_) | ApiError::MissingOutput(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show a client
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Validation(err) => err.to_string(),
            ApiError::Persistence(_) => SAVE_FAILED.to_string(),
            ApiError::Separation(err) if err.is_unexpected() => UNEXPECTED.to_string(),
            ApiError::Separation(_) => PROCESSING_FAILED.to_string(),
            ApiError::MissingOutput(_) => OUTPUT_MISSING.to_string(),
            ApiError::NotFound(_) => FILE_NOT_FOUND.to_string(),
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        // Escapes and misses look identical to the client
        ApiError::NotFound(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
