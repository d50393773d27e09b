//! Error types for jarvis-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jarvis_evolution::EngineError;
use jarvis_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Server-level errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Logging could not be initialised
    #[error("Logging error: {0}")]
    Logging(String),

    /// History could not be opened
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// A cycle is already running
    #[error("An evolution cycle is already running")]
    Busy,

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Busy => ApiError::Busy,
            EngineError::Aborted(message) => ApiError::Internal(message),
            EngineError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Busy => (StatusCode::CONFLICT, "busy"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
