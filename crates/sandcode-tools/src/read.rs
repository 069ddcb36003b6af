//! Read tool.

use crate::{parse_args, require_path, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ReadParams {
    #[serde(default)]
    path: String,
}

/// Read a text file from the sandbox.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn id(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file and return its content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path relative to the project root"
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let params: ReadParams = parse_args(args)?;
        let path = require_path(&params.path)?;

        let content = ctx.sandbox.lock().await.read_file(path).await?;
        Ok(match content {
            Some(content) => json!({"content": content}),
            None => json!({"error": "not found"}),
        })
    }
}
