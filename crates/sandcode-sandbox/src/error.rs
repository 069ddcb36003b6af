//! Error types for sandbox operations.

use thiserror::Error;

/// Errors that can occur during sandbox operations.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// No sandbox metadata is set
    #[error("no active sandbox")]
    NoActiveSandbox,

    /// Project name is empty or not a single path segment
    #[error("invalid project name: {0}")]
    InvalidProject(String),

    /// Path escapes the sandbox directory or is otherwise unusable
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Command or dev server could not be spawned
    #[error("command execution failed: {0}")]
    ExecFailed(String),

    /// Failed to persist sandbox state
    #[error("state persistence failed: {0}")]
    Storage(#[from] sandcode_storage::StorageError),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Create an invalid path error
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }

    /// Create an exec failed error
    pub fn exec_failed(message: impl Into<String>) -> Self {
        Self::ExecFailed(message.into())
    }

    /// Check if this error means no sandbox has been initialized
    pub fn is_no_active(&self) -> bool {
        matches!(self, Self::NoActiveSandbox)
    }
}

impl From<sandcode_util::Error> for SandboxError {
    fn from(err: sandcode_util::Error) -> Self {
        match err.kind() {
            sandcode_util::ErrorKind::Io => Self::Io(std::io::Error::other(err.to_string())),
            _ => Self::InvalidPath(err.to_string()),
        }
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
