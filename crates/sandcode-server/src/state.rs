//! Server state.

use sandcode_core::{Config, CoreResult, Orchestrator};
use sandcode_sandbox::{shared, SandboxManager, SharedSandbox};
use sandcode_storage::ChatHistoryStore;
use std::path::PathBuf;
use std::sync::Arc;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide sandbox.
    pub sandbox: SharedSandbox,
    pub orchestrator: Arc<Orchestrator>,
    pub history: Arc<ChatHistoryStore>,
    /// Root of all projects; the file manager falls back to it when no
    /// sandbox is set.
    pub workspace_root: PathBuf,
}

impl AppState {
    /// State around an existing orchestrator. The sandbox is the
    /// orchestrator's own.
    pub fn new(
        orchestrator: Orchestrator,
        history: ChatHistoryStore,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sandbox: orchestrator.sandbox().clone(),
            orchestrator: Arc::new(orchestrator),
            history: Arc::new(history),
            workspace_root: workspace_root.into(),
        }
    }

    /// Build the full state from configuration, restoring persisted sandbox
    /// state.
    pub async fn from_config(config: &Config) -> CoreResult<Self> {
        let sandbox_config = config.sandbox_config();
        let workspace_root = sandbox_config.workspace_root.clone();
        tokio::fs::create_dir_all(&workspace_root).await?;

        let sandbox: SharedSandbox = shared(SandboxManager::new(sandbox_config).await?);
        let history =
            ChatHistoryStore::new(config.history_root()).with_legacy_root(&workspace_root);
        let orchestrator = Orchestrator::from_config(config, sandbox);

        Ok(Self::new(orchestrator, history, workspace_root))
    }
}
