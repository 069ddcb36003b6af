//! sandcode - coding assistant backend.
//!
//! This is the main entry point for the sandcode CLI.

mod commands;

use clap::{Parser, Subcommand};
use commands::{HistoryCommands, SandboxCommands};
use sandcode_core::Config;
use sandcode_util::log::{self, LogConfig, LogLevel};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sandcode")]
#[command(author, version, about = "Coding assistant backend with a sandboxed workspace", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Extra configuration file, applied after all other sources
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to (defaults to the configured host and port)
        #[arg(short, long)]
        address: Option<SocketAddr>,
    },
    /// Send one message through the orchestrator and print the reply
    Chat {
        /// Message to send
        #[arg(num_args = 1.., required = true)]
        message: Vec<String>,
        /// Model label (see `sandcode models`)
        #[arg(short, long)]
        model: Option<String>,
        /// Sandbox project
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Drive the sandbox directly
    Sandbox {
        #[command(subcommand)]
        command: SandboxCommands,
    },
    /// Inspect chat history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// List model labels
    Models,
    /// Show configuration
    Config,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref()).await?;

    init_logging(&config, cli.verbose, cli.log_file);

    match cli.command {
        Commands::Serve { address } => commands::run_server(&config, address).await,
        Commands::Chat {
            message,
            model,
            project,
        } => commands::run_chat(&config, message.join(" "), model, project).await,
        Commands::Sandbox { command } => commands::handle_sandbox(&config, command).await,
        Commands::History { command } => commands::handle_history(&config, command).await,
        Commands::Models => {
            commands::list_models(&config);
            Ok(())
        }
        Commands::Config => commands::show_config(&cwd, cli.config.as_deref()).await,
        Commands::Version => {
            println!("sandcode {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Merge all configuration sources, then the `--config` file.
pub(crate) async fn load_config(cwd: &Path, extra: Option<&Path>) -> anyhow::Result<Config> {
    let (config, _) = Config::load(Some(cwd)).await?;
    match extra {
        Some(path) => Ok(config.merge(Config::load_file(path).await?)),
        None => Ok(config),
    }
}

/// `--verbose` forces debug; otherwise the configured level applies.
fn init_logging(config: &Config, verbose: bool, log_file: Option<PathBuf>) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        config.log_level.unwrap_or_default()
    };
    let log_config = LogConfig {
        file: log_file,
        ..LogConfig::for_level(level)
    };
    if let Some(path) = log::init(log_config) {
        tracing::debug!(path = %path.display(), "Logging to file");
    }
}
