//! One-shot chat command handler.

use sandcode_core::{ChatRequest, Config, Orchestrator};
use sandcode_provider::Message;
use sandcode_sandbox::{shared, SandboxManager};

/// Run one orchestrated turn and print the reply.
pub async fn run_chat(
    config: &Config,
    message: String,
    model: Option<String>,
    project: Option<String>,
) -> anyhow::Result<()> {
    let sandbox = shared(SandboxManager::new(config.sandbox_config()).await?);
    let orchestrator = Orchestrator::from_config(config, sandbox.clone());

    let outcome = orchestrator
        .chat(ChatRequest {
            messages: vec![Message::user(message)],
            model,
            project,
        })
        .await?;

    println!("{}", outcome.assistant);
    if outcome.tool_calls > 0 {
        eprintln!(
            "({} tool calls in {} rounds)",
            outcome.tool_calls, outcome.iterations
        );
    }

    // The dev server does not outlive the command.
    sandbox.lock().await.stop_dev().await;
    Ok(())
}
