//! Error types for the Drover server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use drover_core::CoreError;
use serde_json::json;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status, error type, stable code and hint for this error
    pub fn classify(&self) -> (StatusCode, &'static str, &'static str, &'static str) {
        match self {
            ServerError::Core(core_err) => Self::map_core_error(core_err),
            ServerError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "INVALID_REQUEST",
                "Check the request format and required parameters",
            ),
            ServerError::Json(_) => (
                StatusCode::BAD_REQUEST,
                "json_parse_error",
                "INVALID_JSON",
                "Check JSON syntax and format",
            ),
            ServerError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                "CONFIG_SERVER",
                "Contact system administrator - server configuration issue",
            ),
            ServerError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                "IO_ERROR",
                "Check file system permissions and disk space",
            ),
            ServerError::Timeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "request_timeout",
                "REQUEST_TIMEOUT",
                "Raise limits.request_timeout or request fewer cold models",
            ),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_server_error",
                "INTERNAL_ERROR",
                "Contact support if this error persists",
            ),
        }
    }

    /// Map core errors to HTTP responses by code prefix
    fn map_core_error(
        core_err: &CoreError,
    ) -> (StatusCode, &'static str, &'static str, &'static str) {
        let code = core_err.code();

        match code {
            "CACHE_TOO_MANY_MODELS" => (
                StatusCode::BAD_REQUEST,
                "too_many_models",
                code,
                "Request fewer models at once or raise cache.capacity",
            ),
            "CACHE_CAPACITY_EXHAUSTED" => (
                StatusCode::SERVICE_UNAVAILABLE,
                "capacity_exhausted",
                code,
                "Other requests are holding every resident model, retry shortly",
            ),
            code if code.starts_with("INVALID_") => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                code,
                "Check input parameters and values",
            ),
            "MODEL_LOAD_FAILED" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "model_load_failed",
                code,
                "Check that the model artifact exists under models.models_dir",
            ),
            code if code.starts_with("MODEL_") => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "model_error",
                code,
                "Check the model input payload",
            ),
            code if code.starts_with("CONFIG_") => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                code,
                "Contact system administrator - configuration issue",
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "core_error",
                code,
                "An error occurred in the model cache",
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type, error_code, suggestion) = self.classify();

        if status.is_server_error() {
            tracing::error!(error = %self, error_code, "Request failed");
        } else {
            tracing::debug!(error = %self, error_code, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "code": status.as_u16(),
                "error_code": error_code,
                "suggestion": suggestion,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}
