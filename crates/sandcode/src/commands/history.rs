//! Chat history command handlers.

use clap::Subcommand;
use sandcode_core::Config;
use sandcode_storage::ChatHistoryStore;

/// History subcommands.
#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List sessions of a project
    List {
        /// Project name
        project: String,
    },
    /// Print the messages of a session
    Show {
        /// Project name
        project: String,
        /// Session name (defaults to `history`)
        #[arg(short, long)]
        session: Option<String>,
        /// Only the last N messages
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete a session
    Clear {
        /// Project name
        project: String,
        /// Session name (defaults to `history`)
        #[arg(short, long)]
        session: Option<String>,
    },
}

/// Handle history commands.
pub async fn handle_history(config: &Config, command: HistoryCommands) -> anyhow::Result<()> {
    let store = ChatHistoryStore::new(config.history_root())
        .with_legacy_root(config.sandbox_config().workspace_root);

    match command {
        HistoryCommands::List { project } => {
            let sessions = store.list_sessions(&project).await?;
            if sessions.is_empty() {
                println!("No sessions found.");
            } else {
                for session in sessions {
                    println!("{session}");
                }
            }
        }
        HistoryCommands::Show {
            project,
            session,
            limit,
        } => {
            let entries = store.load(&project, session.as_deref(), limit).await?;
            if entries.is_empty() {
                println!("No messages.");
            }
            for entry in entries {
                println!("[{}] {}: {}", entry.timestamp, entry.role, entry.content);
            }
        }
        HistoryCommands::Clear { project, session } => {
            store.clear(&project, session.as_deref()).await?;
            println!("History cleared.");
        }
    }

    Ok(())
}
