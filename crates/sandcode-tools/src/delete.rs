//! Delete tool.

use crate::{parse_args, require_path, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct DeleteParams {
    #[serde(default)]
    path: String,
}

/// Delete a file and drop it from the cache.
pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn id(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file at given path."
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
        let params: DeleteParams = parse_args(args)?;
        let path = require_path(&params.path)?;

        let deleted = ctx
            .sandbox
            .lock()
            .await
            .delete_file_and_cache(path)
            .await?;
        if !deleted {
            return Ok(json!({"error": "not found"}));
        }

        debug!(path = %path, "Deleted file");
        Ok(json!({"result": "deleted", "path": path}))
    }
}
