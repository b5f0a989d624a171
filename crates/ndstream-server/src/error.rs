//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndstream_common::StreamError;
use serde_json::json;
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Result type alias for request handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Errors a handler can turn into an HTTP response
///
/// Once a stream response has started, failures can no longer change the
/// status code; they end the body instead and are only logged.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Stream(StreamError::Config(_)) => (StatusCode::BAD_REQUEST, "config_error"),
            AppError::Stream(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse::with_details(
            code,
            message,
            json!({ "status": status.as_u16() }),
        );

        (status, Json(body)).into_response()
    }
}
