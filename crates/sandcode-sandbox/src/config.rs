//! Configuration types for sandbox settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder replaced by the dev port in [`SandboxConfig::dev_command`].
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Main sandbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Directory holding one subdirectory per project plus the state files
    pub workspace_root: PathBuf,

    /// Port the dev server listens on
    pub dev_port: u16,

    /// Host part of the advertised dev-server URL
    pub dev_host: String,

    /// Dependency install command (argv). Exit status is ignored.
    pub install_command: Vec<String>,

    /// Dev server command (argv). `{port}` is replaced with `dev_port`.
    pub dev_command: Vec<String>,

    /// Python interpreter used to create the per-sandbox venv
    pub python: String,

    /// Files at or above this size are skipped when walking the workspace
    pub max_cache_file_bytes: u64,

    /// Default timeout for `run_command`
    pub command_timeout_secs: u64,

    /// Time the dev server gets between SIGTERM and SIGKILL
    pub kill_grace_secs: u64,

    /// Default sandbox lifetime recorded in metadata
    pub default_timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("./workspaces"),
            dev_port: 5173,
            dev_host: "localhost".to_string(),
            install_command: vec!["npm".to_string(), "install".to_string()],
            dev_command: ["npm", "run", "dev", "--", "--port", PORT_PLACEHOLDER]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            python: "python3".to_string(),
            max_cache_file_bytes: 10 * 1024,
            command_timeout_secs: 60,
            kill_grace_secs: 10,
            default_timeout_ms: 5 * 60_000,
        }
    }
}

impl SandboxConfig {
    /// Config rooted at `workspace_root` with every other field defaulted.
    pub fn with_root(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Default::default()
        }
    }

    /// Base URL of the dev server.
    pub fn dev_url(&self) -> String {
        format!("http://{}:{}", self.dev_host, self.dev_port)
    }

    /// Dev command argv with the port substituted.
    pub fn dev_argv(&self) -> Vec<String> {
        let port = self.dev_port.to_string();
        self.dev_command
            .iter()
            .map(|arg| arg.replace(PORT_PLACEHOLDER, &port))
            .collect()
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}
