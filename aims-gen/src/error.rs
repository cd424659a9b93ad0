//! Error types for aims-gen
//!
//! Every error renders as `{"success": false, "error": "<message>"}` with the
//! matching HTTP status.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Model backend was never configured or failed to load (500)
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Inference runtime call failed (500)
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// aims-common error
    #[error("Common error: {0}")]
    Common(#[from] aims_common::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Common(aims_common::Error::EmptyInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::ModelUnavailable(_)
            | ApiError::Inference(_)
            | ApiError::Internal(_)
            | ApiError::Io(_)
            | ApiError::Common(_)
            | ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client
    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::ModelUnavailable(msg)
            | ApiError::Inference(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Io(err) => err.to_string(),
            ApiError::Common(err) => err.to_string(),
            ApiError::Other(err) => format!("{:#}", err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %message, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
