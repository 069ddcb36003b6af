//! List tool - immediate children of a directory.

use crate::{parse_args, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    dir: Option<String>,
}

/// List files and directories.
pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn id(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories in a directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dir": {
                    "type": "string",
                    "description": "Directory relative to the project root (default: root)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let params: ListParams = parse_args(args)?;
        let dir = params.dir.unwrap_or_default();

        let listing = ctx.sandbox.lock().await.list_dir(&dir).await?;
        Ok(match listing {
            Some(listing) => json!({"files": listing.files, "dirs": listing.dirs}),
            None => json!({"error": "dir not found"}),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_root_and_subdir() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;

        let result = ListFilesTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(
            result,
            json!({"files": ["index.html", "package.json"], "dirs": ["src"]})
        );

        let src = ListFilesTool
            .execute(json!({"dir": "src"}), &ctx)
            .await
            .unwrap();
        assert_eq!(src["files"], json!(["App.jsx", "main.jsx"]));

        let missing = ListFilesTool
            .execute(json!({"dir": "nowhere"}), &ctx)
            .await
            .unwrap();
        assert_eq!(missing, json!({"error": "dir not found"}));
    }
}
