//! Rename tool.

use crate::{parse_args, require_path, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct RenameParams {
    path: String,
    new_name: String,
}

/// Rename a file within its directory.
pub struct RenameFileTool;

#[async_trait]
impl Tool for RenameFileTool {
    fn id(&self) -> &str {
        "rename_file"
    }

    fn description(&self) -> &str {
        "Rename a file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path", "new_name"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Current file path relative to the project root"
                },
                "new_name": {
                    "type": "string",
                    "description": "New file name (no directory part)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let params: RenameParams = parse_args(args)?;
        let path = require_path(&params.path)?;

        let renamed = ctx
            .sandbox
            .lock()
            .await
            .rename_file_and_cache(path, &params.new_name)
            .await?;

        Ok(match renamed {
            Some(new) => json!({"result": "renamed", "old": path, "new": new}),
            None => json!({"error": "not found"}),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rename_moves_cache_entry() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;
        ctx.sandbox
            .lock()
            .await
            .write_file_and_cache("src/Old.jsx", "x")
            .await
            .unwrap();

        let result = RenameFileTool
            .execute(json!({"path": "src/Old.jsx", "new_name": "New.jsx"}), &ctx)
            .await
            .unwrap();
        assert_eq!(
            result,
            json!({"result": "renamed", "old": "src/Old.jsx", "new": "src/New.jsx"})
        );

        let sandbox = ctx.sandbox.lock().await;
        assert!(sandbox.cached("src/Old.jsx").is_none());
        assert_eq!(sandbox.cached("src/New.jsx").unwrap().content, "x");
        assert!(root.path().join("demo/src/New.jsx").exists());
    }

    #[tokio::test]
    async fn test_rename_missing_and_invalid() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;

        let missing = RenameFileTool
            .execute(json!({"path": "ghost.txt", "new_name": "x.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(missing, json!({"error": "not found"}));

        assert!(RenameFileTool
            .execute(json!({"path": "index.html", "new_name": "../x.html"}), &ctx)
            .await
            .is_err());
        assert!(RenameFileTool
            .execute(json!({"path": "index.html"}), &ctx)
            .await
            .is_err());
    }
}
