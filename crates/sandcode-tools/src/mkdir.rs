//! Directory creation, registered under several names models commonly use.

use crate::{parse_args, require_path, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// Names the directory tool answers to.
pub const MAKE_DIR_ALIASES: [&str; 3] = ["make_dir", "create_dir", "mkdir"];

#[derive(Debug, Deserialize)]
struct MakeDirParams {
    path: String,
}

/// Create a directory and its parents.
pub struct MakeDirTool {
    id: &'static str,
}

impl MakeDirTool {
    pub fn new(id: &'static str) -> Self {
        Self { id }
    }

    /// One tool per alias.
    pub fn all() -> Vec<Self> {
        MAKE_DIR_ALIASES.into_iter().map(Self::new).collect()
    }
}

#[async_trait]
impl Tool for MakeDirTool {
    fn id(&self) -> &str {
        self.id
    }

    fn description(&self) -> &str {
        "Create a directory (and parents) at path."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["path"],
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path relative to the project root"
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let params: MakeDirParams = parse_args(args)?;
        let path = require_path(&params.path)?;

        ctx.sandbox.lock().await.make_dir(path).await?;
        Ok(json!({"result": "created", "path": path}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_aliases_create_nested_dirs() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;

        for (tool, path) in MakeDirTool::all().iter().zip(["a/b", "c", "a/b"]) {
            let result = tool.execute(json!({"path": path}), &ctx).await.unwrap();
            assert_eq!(result, json!({"result": "created", "path": path}));
        }
        assert!(root.path().join("demo/a/b").is_dir());
        assert!(root.path().join("demo/c").is_dir());
    }

    #[tokio::test]
    async fn test_rejects_escape() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;

        let err = MakeDirTool::new("mkdir")
            .execute(json!({"path": "../../outside"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid path"));
    }
}
