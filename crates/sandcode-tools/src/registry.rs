//! Tool registry.

use crate::{BoxedTool, ToolContext, ToolError};
use sandcode_provider::ToolDefinition;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
    definitions: OnceLock<Vec<ToolDefinition>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            definitions: OnceLock::new(),
        }
    }

    /// Create a registry with all built-in tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(crate::write::WriteFileTool));
        registry.register(Arc::new(crate::write::AppendFileTool));
        registry.register(Arc::new(crate::read::ReadFileTool));
        registry.register(Arc::new(crate::delete::DeleteFileTool));
        registry.register(Arc::new(crate::rename::RenameFileTool));
        registry.register(Arc::new(crate::list::ListFilesTool));
        for tool in crate::mkdir::MakeDirTool::all() {
            registry.register(Arc::new(tool));
        }
        registry.register(Arc::new(crate::dev::StartDevTool));
        registry.register(Arc::new(crate::dev::StopDevTool));

        registry
    }

    /// Register a tool, replacing any tool with the same ID.
    pub fn register(&mut self, tool: BoxedTool) {
        self.tools.insert(tool.id().to_string(), tool);
        self.definitions = OnceLock::new();
    }

    /// Get a tool by ID.
    pub fn get(&self, id: &str) -> Option<&BoxedTool> {
        self.tools.get(id)
    }

    /// List all tool IDs, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Declarations sent to the model, sorted by name.
    pub fn definitions(&self) -> &[ToolDefinition] {
        self.definitions.get_or_init(|| {
            let mut defs: Vec<ToolDefinition> = self
                .tools
                .values()
                .map(|tool| ToolDefinition {
                    name: tool.id().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                })
                .collect();
            defs.sort_by(|a, b| a.name.cmp(&b.name));
            defs
        })
    }

    /// Run a tool by name. Never fails: problems come back as
    /// `{"error": "<message>"}`.
    pub async fn dispatch(&self, name: &str, args: Value, ctx: &ToolContext) -> Value {
        let Some(tool) = self.get(name) else {
            warn!(tool = %name, "Model requested unknown tool");
            return error_value(&ToolError::UnknownTool(name.to_string()));
        };

        debug!(tool = %name, args = %args, "Executing tool");
        match tool.execute(args, ctx).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool failed");
                error_value(&e)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn error_value(err: &ToolError) -> Value {
    json!({"error": err.to_string()})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_definitions_sorted() {
        let registry = ToolRegistry::with_builtins();
        let names: Vec<&str> = registry
            .definitions()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "append_file",
                "create_dir",
                "delete_file",
                "list_files",
                "make_dir",
                "mkdir",
                "read_file",
                "rename_file",
                "start_dev",
                "stop_dev",
                "write_file",
            ]
        );
        assert_eq!(registry.list(), names);

        let write = &registry.definitions()[10];
        assert_eq!(write.description, "Create or overwrite a text file at given path.");
        assert_eq!(write.parameters["required"], json!(["path", "content"]));
    }

    #[tokio::test]
    async fn test_dispatch_turns_failures_into_values() {
        let root = TempDir::new().unwrap();
        let ctx = testing::context(&root).await;
        let registry = ToolRegistry::with_builtins();

        let unknown = registry.dispatch("fly", json!({}), &ctx).await;
        assert_eq!(unknown, json!({"error": "unknown tool fly"}));

        let invalid = registry.dispatch("write_file", json!({"path": 3}), &ctx).await;
        assert!(invalid["error"].as_str().unwrap().starts_with("Validation error"));

        let written = registry
            .dispatch("write_file", json!({"path": "a.txt", "content": "hi"}), &ctx)
            .await;
        assert_eq!(written, json!({"result": "written", "path": "a.txt"}));

        let read = registry
            .dispatch("read_file", json!({"path": "a.txt"}), &ctx)
            .await;
        assert_eq!(read, json!({"content": "hi"}));
    }

    #[tokio::test]
    async fn test_dispatch_without_sandbox() {
        let root = TempDir::new().unwrap();
        let ctx = testing::uninitialized(&root).await;
        let registry = ToolRegistry::with_builtins();

        let result = registry.dispatch("list_files", json!({}), &ctx).await;
        assert_eq!(result, json!({"error": "no active sandbox"}));
    }
}
