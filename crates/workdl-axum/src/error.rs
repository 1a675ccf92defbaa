//! Axum-specific error types and mappings.
//!
//! Maps [`EngineError`] categories to HTTP status codes and a JSON body of
//! the form `{ "error", "status", "type" }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use workdl_core::{EngineError, ErrorKind};

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict (a download is already running).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error type discriminant for client-side handling.
    const fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    #[serde(rename = "type")]
    error_type: &'static str,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.error_type();
        let message = match self {
            Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg)
            | Self::Internal(msg) => msg,
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
            error_type,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<EngineError> for HttpError {
    fn from(err: EngineError) -> Self {
        let message = err.user_message();
        match err.kind() {
            ErrorKind::Validation => Self::BadRequest(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Internal => {
                tracing::warn!(target: "workdl.http", error = %err, "Request failed");
                Self::Internal(message)
            }
        }
    }
}
