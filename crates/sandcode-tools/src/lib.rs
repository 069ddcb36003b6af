//! Tools the model can call to act on the active sandbox.
//!
//! Every tool takes a JSON argument object, deserializes it into a typed
//! parameter record and returns a JSON result. Failures never escape the
//! [`ToolRegistry`]: they are turned into `{"error": ...}` results that are
//! fed back to the model.

pub mod error;
pub mod registry;

// Tool implementations
pub mod delete;
pub mod dev;
pub mod list;
pub mod mkdir;
pub mod read;
pub mod rename;
pub mod write;

pub use error::{ToolError, ToolResult};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use sandcode_sandbox::SharedSandbox;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Context provided to tools during execution.
#[derive(Clone)]
pub struct ToolContext {
    /// The sandbox every file and process operation goes through.
    pub sandbox: SharedSandbox,
}

impl ToolContext {
    pub fn new(sandbox: SharedSandbox) -> Self {
        Self { sandbox }
    }
}

/// The main trait for tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool ID.
    fn id(&self) -> &str;

    /// Get the tool description (for the AI).
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value>;
}

/// A boxed tool for dynamic dispatch.
pub type BoxedTool = Arc<dyn Tool>;

/// Deserialize tool arguments into a parameter record. `null` counts as an
/// empty object.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::validation(e.to_string()))
}

/// Reject empty path arguments.
pub(crate) fn require_path(path: &str) -> ToolResult<&str> {
    if path.trim().is_empty() {
        return Err(ToolError::validation("path is required"));
    }
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Params {
        path: String,
        #[serde(default)]
        dir: Option<String>,
    }

    #[test]
    fn test_parse_args() {
        let params: Params = parse_args(json!({"path": "a.txt"})).unwrap();
        assert_eq!(params.path, "a.txt");
        assert!(params.dir.is_none());

        let err = parse_args::<Params>(Value::Null).unwrap_err();
        assert!(err.to_string().contains("missing field `path`"));

        assert!(parse_args::<Params>(json!({"path": 5})).is_err());
    }

    #[test]
    fn test_require_path() {
        assert!(require_path("  ").is_err());
        assert_eq!(require_path("src").unwrap(), "src");
    }
}
