//! Write and append tools.

use crate::{parse_args, require_path, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::OnceLock;
use tracing::debug;

static FENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn fence_regex() -> &'static Regex {
    FENCE_REGEX.get_or_init(|| {
        Regex::new(r"^```[\w.+-]*\s*\n([\s\S]*?)\n```\s*$")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Strip a single surrounding markdown code fence, if the whole text is one.
pub fn unwrap_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match fence_regex().captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text,
    }
}

#[derive(Debug, Deserialize)]
struct WriteParams {
    path: String,
    content: String,
}

fn schema() -> Value {
    json!({
        "type": "object",
        "required": ["path", "content"],
        "properties": {
            "path": {
                "type": "string",
                "description": "File path relative to the project root"
            },
            "content": {
                "type": "string",
                "description": "Text content"
            }
        }
    })
}

/// Create or overwrite a file.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn id(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a text file at given path."
    }

    fn parameters_schema(&self) -> Value {
        schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let params: WriteParams = parse_args(args)?;
        let path = require_path(&params.path)?;
        let content = unwrap_fence(&params.content);

        debug!(path = %path, bytes = content.len(), "Writing file");
        ctx.sandbox
            .lock()
            .await
            .write_file_and_cache(path, content)
            .await?;

        Ok(json!({"result": "written", "path": path}))
    }
}

/// Append to a file, creating it when missing.
pub struct AppendFileTool;

#[async_trait]
impl Tool for AppendFileTool {
    fn id(&self) -> &str {
        "append_file"
    }

    fn description(&self) -> &str {
        "Append content to the end of a text file."
    }

    fn parameters_schema(&self) -> Value {
        schema()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let params: WriteParams = parse_args(args)?;
        let path = require_path(&params.path)?;
        let content = unwrap_fence(&params.content);

        debug!(path = %path, bytes = content.len(), "Appending to file");
        ctx.sandbox
            .lock()
            .await
            .append_file_and_cache(path, content)
            .await?;

        Ok(json!({"result": "appended", "path": path}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tempfile::TempDir;

    #[test]
    fn test_unwrap_fence() {
        assert_eq!(unwrap_fence("```jsx\nconst a = 1;\n```"), "const a = 1;");
        assert_eq!(unwrap_fence("  ```\nline1\nline2\n```\n"), "line1\nline2");
        assert_eq!(unwrap_fence("```c++ \nint x;\n```"), "int x;");
        assert_eq!(unwrap_fence("plain text"), "plain text");
        assert_eq!(
            unwrap_fence("before\n```js\nx\n```"),
            "before\n```js\nx\n```"
        );
    }

    #[tokio::test]
    async fn test_write_unwraps_fence_and_caches() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;

        let result = WriteFileTool
            .execute(
                json!({"path": "src/App.jsx", "content": "```jsx\nexport default 1;\n```"}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"result": "written", "path": "src/App.jsx"}));

        let on_disk = std::fs::read_to_string(root.path().join("demo/src/App.jsx")).unwrap();
        assert_eq!(on_disk, "export default 1;");
        let sandbox = ctx.sandbox.lock().await;
        assert_eq!(sandbox.cached("src/App.jsx").unwrap().content, on_disk);
    }

    #[tokio::test]
    async fn test_append_caches_full_content() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;

        for chunk in ["one\n", "two\n"] {
            let result = AppendFileTool
                .execute(json!({"path": "log.txt", "content": chunk}), &ctx)
                .await
                .unwrap();
            assert_eq!(result["result"], "appended");
        }

        let sandbox = ctx.sandbox.lock().await;
        assert_eq!(sandbox.cached("log.txt").unwrap().content, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_write_requires_content() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;

        let err = WriteFileTool
            .execute(json!({"path": "a.txt"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("content"));
    }
}
