//! JSON error bodies for HTTP handlers.

use axum::{http::StatusCode, Json};
use sandcode_core::CoreError;
use sandcode_sandbox::SandboxError;
use sandcode_storage::StorageError;
use serde::Serialize;
use tracing::error;

/// Error body returned by every failing handler.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

/// Handler error: status plus JSON body.
pub type ApiFailure = (StatusCode, Json<ApiError>);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiFailure>;

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> ApiFailure {
        (StatusCode::NOT_FOUND, Json(Self::new(msg, "NOT_FOUND")))
    }

    pub fn bad_request(msg: impl Into<String>) -> ApiFailure {
        (StatusCode::BAD_REQUEST, Json(Self::new(msg, "BAD_REQUEST")))
    }

    pub fn internal(msg: impl Into<String>) -> ApiFailure {
        let msg = msg.into();
        error!(error = %msg, "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(msg, "INTERNAL_ERROR")),
        )
    }

    /// Precondition failures are the caller's fault; the rest are ours.
    pub fn from_sandbox(err: SandboxError) -> ApiFailure {
        match err {
            SandboxError::NoActiveSandbox
            | SandboxError::InvalidProject(_)
            | SandboxError::InvalidPath(_) => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }

    pub fn from_storage(err: StorageError) -> ApiFailure {
        match err {
            StorageError::InvalidKey(_) => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }

    /// Provider failures map to 400 so clients can show the message.
    pub fn from_core(err: CoreError) -> ApiFailure {
        match err {
            CoreError::Provider(e) => Self::bad_request(e.to_string()),
            CoreError::Sandbox(e) => Self::from_sandbox(e),
            CoreError::Storage(e) => Self::from_storage(e),
            other => Self::internal(other.to_string()),
        }
    }
}
