//! Error handling module for the clan standings backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const NO_TIMELINE_DATA: &str = "NO_TIMELINE_DATA";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const STORE_ERROR: &str = "STORE_ERROR";
    pub const COMPUTATION_ERROR: &str = "COMPUTATION_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// The snapshot store holds zero snapshots; nothing can be aggregated
    MissingTimelineData,
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// Snapshot store I/O error
    Store(String),
    /// Unexpected failure during a recompute pass
    Computation(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    ///
    /// Store-level failures map to 503 so clients present them as "data
    /// temporarily unavailable" rather than a hard error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingTimelineData => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingTimelineData => codes::NO_TIMELINE_DATA,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Store(_) => codes::STORE_ERROR,
            AppError::Computation(_) => codes::COMPUTATION_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::MissingTimelineData => {
                "Clan data temporarily unavailable: no snapshots recorded yet".to_string()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Store(msg) => msg.clone(),
            AppError::Computation(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("Store I/O error: {:?}", err);
        AppError::Store(format!("Snapshot store error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("Snapshot JSON error: {:?}", err);
        AppError::Store(format!("Snapshot parse error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
