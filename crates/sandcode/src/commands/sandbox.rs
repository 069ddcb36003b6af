//! Sandbox command handlers.

use clap::Subcommand;
use sandcode_core::Config;
use sandcode_sandbox::SandboxManager;
use std::time::Duration;

/// Sandbox subcommands.
#[derive(Subcommand)]
pub enum SandboxCommands {
    /// Create (if needed) and select a project sandbox
    Init {
        /// Project name
        project: String,
        /// Sandbox lifetime recorded in metadata, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Start the dev server and keep it running until interrupted
    Start,
    /// Delete the current sandbox and its files
    Kill,
    /// Run a shell command in the sandbox directory
    Exec {
        /// Command line passed to `sh -c`
        #[arg(num_args = 1.., required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        cmd: Vec<String>,
        /// Timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print the file cache as JSON
    Files,
}

/// Handle sandbox commands.
pub async fn handle_sandbox(config: &Config, command: SandboxCommands) -> anyhow::Result<()> {
    let mut sandbox = SandboxManager::new(config.sandbox_config()).await?;

    match command {
        SandboxCommands::Init {
            project,
            timeout_ms,
        } => {
            let meta = sandbox.init(&project, None, timeout_ms).await?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        SandboxCommands::Start => {
            let meta = sandbox.start_dev().await?;
            println!("Dev server for {} at {}", meta.sandbox_id, meta.url);
            println!("Press Ctrl-C to stop.");
            tokio::signal::ctrl_c().await?;
            sandbox.stop_dev().await;
        }
        SandboxCommands::Kill => {
            if !sandbox.has_sandbox() {
                println!("No sandbox.");
                return Ok(());
            }
            sandbox.kill().await?;
            println!("Sandbox removed.");
        }
        SandboxCommands::Exec { cmd, timeout } => {
            let output = sandbox
                .run_command(&cmd.join(" "), timeout.map(Duration::from_secs))
                .await?;
            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            if let Some(error) = &output.error {
                anyhow::bail!("{error}");
            }
            if let Some(code) = output.code.filter(|code| *code != 0) {
                anyhow::bail!("command exited with code {code}");
            }
        }
        SandboxCommands::Files => {
            let files = sandbox.read_files().await?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
    }

    Ok(())
}
