//! Per-project sandbox workspaces for sandcode.
//!
//! A sandbox is a directory named after the project under a configured
//! workspace root. The [`SandboxManager`] owns the single active sandbox:
//!
//! - scaffolding a starter Vite + React app and a Python venv on first use
//! - a persisted cache of files written through it
//! - an optional dev-server child process
//! - shell command execution with a timeout
//!
//! # Example
//!
//! ```rust,no_run
//! use sandcode_sandbox::{SandboxConfig, SandboxManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut manager = SandboxManager::new(SandboxConfig::with_root("./workspaces")).await?;
//!
//!     manager.init("demo", None, None).await?;
//!     manager.write_file_and_cache("src/App.jsx", "export default () => <p>hi</p>;").await?;
//!
//!     let output = manager.run_command("ls src", None).await?;
//!     println!("{}", output.stdout);
//!
//!     manager.kill().await?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod exclude;
pub mod manager;
pub mod process;
pub mod scaffold;
pub mod state;

pub use config::{SandboxConfig, PORT_PLACEHOLDER};
pub use error::{SandboxError, SandboxResult};
pub use exclude::{is_excluded, EXCLUDED_DIRS};
pub use manager::{SandboxManager, API_KEY_ENV};
pub use state::{CachedFile, CommandOutput, DirListing, FileCache, SandboxMeta};

use std::sync::Arc;
use tokio::sync::Mutex;

/// The manager shared between the server, the tools and the chat loop.
///
/// Every operation that touches sandbox state runs under this lock.
pub type SharedSandbox = Arc<Mutex<SandboxManager>>;

/// Wrap a manager for sharing.
pub fn shared(manager: SandboxManager) -> SharedSandbox {
    Arc::new(Mutex::new(manager))
}
