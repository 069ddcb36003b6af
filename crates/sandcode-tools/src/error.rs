//! Tool error types.

use sandcode_sandbox::SandboxError;
use thiserror::Error;

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur during tool execution.
///
/// Every variant ends up as the `error` field of a tool result; none of them
/// abort the conversation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under the name.
    #[error("unknown tool {0}")]
    UnknownTool(String),

    /// Invalid parameters.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The sandbox rejected the operation.
    #[error("{0}")]
    Sandbox(#[from] SandboxError),

    /// Execution failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an execution failed error.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }
}
