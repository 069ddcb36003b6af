//! Dev-server control tools.

use crate::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

fn no_params() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Install dependencies and start the dev server.
pub struct StartDevTool;

#[async_trait]
impl Tool for StartDevTool {
    fn id(&self) -> &str {
        "start_dev"
    }

    fn description(&self) -> &str {
        "Start the dev server for current project."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        let meta = ctx.sandbox.lock().await.start_dev().await?;
        info!(sandbox = %meta.sandbox_id, url = %meta.url, "Dev server started by tool");
        Ok(json!({"result": "started", "url": meta.url}))
    }
}

/// Stop the dev server and tear the sandbox down.
pub struct StopDevTool;

#[async_trait]
impl Tool for StopDevTool {
    fn id(&self) -> &str {
        "stop_dev"
    }

    fn description(&self) -> &str {
        "Stop the dev server."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> ToolResult<Value> {
        ctx.sandbox.lock().await.kill().await?;
        Ok(json!({"result": "stopped"}))
    }
}
