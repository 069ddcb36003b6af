//! The sandbox manager.

use crate::command::run_shell;
use crate::exclude::is_excluded;
use crate::process::{run_install, DevServer};
use crate::scaffold::{ensure_venv, write_scaffold};
use crate::state::{
    CachedFile, CommandOutput, DirListing, FileCache, SandboxMeta, CACHE_KEY, META_KEY,
};
use crate::{SandboxConfig, SandboxError, SandboxResult};
use sandcode_storage::{JsonStorage, Storage};
use sandcode_util::path::{relative_key, safe_join, validate_segment};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Environment variable supplying the default sandbox API key.
pub const API_KEY_ENV: &str = "E2B_API_KEY";

/// Manages the single active sandbox: a project directory under the
/// workspace root, its file cache, and an optional dev-server process.
///
/// Metadata and cache are restored on construction and persisted after every
/// mutating call.
#[derive(Debug)]
pub struct SandboxManager {
    config: SandboxConfig,
    storage: JsonStorage,
    meta: Option<SandboxMeta>,
    cache: FileCache,
    dev_server: Option<DevServer>,
}

impl SandboxManager {
    /// Create a manager, creating the workspace root and loading saved state.
    pub async fn new(config: SandboxConfig) -> SandboxResult<Self> {
        fs::create_dir_all(&config.workspace_root).await?;
        let storage = JsonStorage::new(&config.workspace_root);

        let meta = match storage.read::<SandboxMeta>(&[META_KEY]).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable sandbox metadata");
                None
            }
        };
        let cache = match storage.read::<FileCache>(&[CACHE_KEY]).await {
            Ok(cache) => cache.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable sandbox cache");
                FileCache::new()
            }
        };

        debug!(
            root = %config.workspace_root.display(),
            sandbox = ?meta.as_ref().map(|m| &m.sandbox_id),
            cached_files = cache.len(),
            "Sandbox manager ready"
        );

        Ok(Self {
            config,
            storage,
            meta,
            cache,
            dev_server: None,
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.config.workspace_root
    }

    /// Metadata of the current sandbox, if any.
    pub fn meta(&self) -> Option<&SandboxMeta> {
        self.meta.as_ref()
    }

    /// Whether sandbox metadata is set.
    pub fn has_sandbox(&self) -> bool {
        self.meta.is_some()
    }

    /// Directory of the current sandbox.
    pub fn sandbox_dir(&self) -> SandboxResult<PathBuf> {
        let meta = self.meta.as_ref().ok_or(SandboxError::NoActiveSandbox)?;
        Ok(self.config.workspace_root.join(&meta.sandbox_id))
    }

    /// Whether the dev server has been started and has not exited.
    pub fn is_active(&mut self) -> bool {
        self.dev_server
            .as_mut()
            .is_some_and(|server| server.is_alive())
    }

    /// Current cache contents.
    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Cache entry for a workspace-relative path.
    pub fn cached(&self, rel: &str) -> Option<&CachedFile> {
        let (_, key) = self.resolve(rel).ok()?;
        self.cache.get(&key)
    }

    /// Create the project directory and scaffold if missing, then make it the
    /// active sandbox. Existing files are left alone.
    pub async fn init(
        &mut self,
        project: &str,
        api_key: Option<String>,
        timeout_ms: Option<u64>,
    ) -> SandboxResult<SandboxMeta> {
        let project = validate_segment("project", project)
            .map_err(|e| SandboxError::InvalidProject(e.to_string()))?
            .to_string();

        if self
            .meta
            .as_ref()
            .is_some_and(|meta| meta.sandbox_id != project)
        {
            self.stop_dev().await;
        }

        let dir = self.config.workspace_root.join(&project);
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            fs::create_dir_all(&dir).await?;
            write_scaffold(&dir).await?;
            info!(project = %project, dir = %dir.display(), "Created sandbox workspace");
        }

        ensure_venv(&dir, &self.config.python).await;

        let meta = SandboxMeta {
            sandbox_id: project,
            url: self.config.dev_url(),
            started_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            timeout_ms: timeout_ms.unwrap_or(self.config.default_timeout_ms),
            api_key: api_key
                .filter(|key| !key.is_empty())
                .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty())),
        };

        self.meta = Some(meta.clone());
        self.cache.clear();
        self.persist().await?;
        Ok(meta)
    }

    /// Install dependencies and start the dev server unless it is running.
    ///
    /// Returns immediately after spawning; readiness is not awaited.
    pub async fn start_dev(&mut self) -> SandboxResult<SandboxMeta> {
        let meta = self.meta.clone().ok_or(SandboxError::NoActiveSandbox)?;
        if self.is_active() {
            debug!(sandbox = %meta.sandbox_id, "Dev server already running");
            return Ok(meta);
        }

        let dir = self.sandbox_dir()?;
        run_install(&self.config.install_command, &dir).await;
        self.dev_server = Some(DevServer::spawn(&self.config.dev_argv(), &dir)?);
        Ok(meta)
    }

    /// `init` followed by `start_dev`.
    pub async fn create(
        &mut self,
        project: &str,
        api_key: Option<String>,
        timeout_ms: Option<u64>,
    ) -> SandboxResult<SandboxMeta> {
        self.init(project, api_key, timeout_ms).await?;
        self.start_dev().await
    }

    /// Stop the dev server, delete the sandbox directory and forget all state.
    pub async fn kill(&mut self) -> SandboxResult<()> {
        if self.meta.is_none() && self.dev_server.is_none() {
            return Ok(());
        }

        self.stop_dev().await;

        if let Ok(dir) = self.sandbox_dir() {
            match fs::remove_dir_all(&dir).await {
                Ok(()) => info!(dir = %dir.display(), "Removed sandbox workspace"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove sandbox workspace"),
            }
        }

        self.meta = None;
        self.cache.clear();
        self.persist().await
    }

    /// Stop the dev server, keeping the sandbox and its files.
    pub async fn stop_dev(&mut self) {
        if let Some(server) = self.dev_server.take() {
            server.terminate(self.config.kill_grace()).await;
        }
    }

    /// Write a file and record it in the cache. Excluded paths are skipped.
    pub async fn write_file_and_cache(&mut self, rel: &str, content: &str) -> SandboxResult<()> {
        if is_excluded(rel) {
            debug!(path = %rel, "Skipping write to excluded path");
            return Ok(());
        }

        let (full, key) = self.resolve(rel)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, content).await?;

        self.cache.insert(key, CachedFile::now(content));
        self.persist().await
    }

    /// Append to a file (creating it) and cache the full resulting content.
    pub async fn append_file_and_cache(&mut self, rel: &str, content: &str) -> SandboxResult<()> {
        if is_excluded(rel) {
            debug!(path = %rel, "Skipping append to excluded path");
            return Ok(());
        }

        let (full, key) = self.resolve(rel)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, content.as_bytes()).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        drop(file);

        let bytes = fs::read(&full).await?;
        self.cache
            .insert(key, CachedFile::now(String::from_utf8_lossy(&bytes)));
        self.persist().await
    }

    /// Read a file from the sandbox. `None` when it does not exist.
    pub async fn read_file(&self, rel: &str) -> SandboxResult<Option<String>> {
        let (full, _) = self.resolve_any(rel)?;
        match fs::read(&full).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file (or empty directory). Returns `false` when missing.
    pub async fn delete_file_and_cache(&mut self, rel: &str) -> SandboxResult<bool> {
        let (full, key) = self.resolve(rel)?;
        let metadata = match fs::metadata(&full).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            fs::remove_dir(&full).await?;
        } else {
            fs::remove_file(&full).await?;
        }

        let prefix = format!("{key}/");
        self.cache
            .retain(|cached, _| cached != &key && !cached.starts_with(&prefix));
        self.persist().await?;
        Ok(true)
    }

    /// Rename within the same directory. Returns the new relative path, or
    /// `None` when the source does not exist.
    pub async fn rename_file_and_cache(
        &mut self,
        rel: &str,
        new_name: &str,
    ) -> SandboxResult<Option<String>> {
        let new_name = validate_segment("new name", new_name)?;
        let (full, key) = self.resolve(rel)?;
        if !fs::try_exists(&full).await.unwrap_or(false) {
            return Ok(None);
        }

        let target = full
            .parent()
            .map(|parent| parent.join(new_name))
            .ok_or_else(|| SandboxError::invalid_path(rel))?;
        fs::rename(&full, &target).await?;

        let dir = self.sandbox_dir()?;
        let new_key = relative_key(&target, &dir)
            .ok_or_else(|| SandboxError::invalid_path(new_name))?;

        let prefix = format!("{key}/");
        let moved: Vec<String> = self
            .cache
            .keys()
            .filter(|cached| *cached == &key || cached.starts_with(&prefix))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = self.cache.remove(&old) {
                let renamed = format!("{new_key}{}", &old[key.len()..]);
                self.cache.insert(renamed, entry);
            }
        }

        self.persist().await?;
        Ok(Some(new_key))
    }

    /// Create a directory and its parents. Idempotent.
    pub async fn make_dir(&self, rel: &str) -> SandboxResult<()> {
        let (full, _) = self.resolve_any(rel)?;
        fs::create_dir_all(&full).await?;
        Ok(())
    }

    /// List a directory's files and subdirectories. `None` if it is not a
    /// directory.
    pub async fn list_dir(&self, rel: &str) -> SandboxResult<Option<DirListing>> {
        let (full, _) = self.resolve_any(rel)?;
        match fs::metadata(&full).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut entries = fs::read_dir(&full).await?;
        let mut listing = DirListing::default();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                listing.dirs.push(name);
            } else {
                listing.files.push(name);
            }
        }
        listing.files.sort();
        listing.dirs.sort();
        Ok(Some(listing))
    }

    /// The cache, populated by a one-time walk of the sandbox when empty.
    pub async fn read_files(&mut self) -> SandboxResult<FileCache> {
        if !self.cache.is_empty() {
            return Ok(self.cache.clone());
        }

        let dir = self.sandbox_dir()?;
        let max_bytes = self.config.max_cache_file_bytes;
        let files = tokio::task::spawn_blocking(move || walk_workspace(&dir, max_bytes))
            .await
            .map_err(|e| SandboxError::exec_failed(format!("workspace walk failed: {e}")))?;

        debug!(files = files.len(), "Populated sandbox cache from disk");
        self.cache = files;
        self.persist().await?;
        Ok(self.cache.clone())
    }

    /// Run a shell command in the sandbox directory.
    pub async fn run_command(
        &self,
        cmd: &str,
        timeout: Option<Duration>,
    ) -> SandboxResult<CommandOutput> {
        let dir = self.sandbox_dir()?;
        let venv_bin = dir.join("venv").join("bin");
        let venv_bin = fs::try_exists(&venv_bin)
            .await
            .unwrap_or(false)
            .then_some(venv_bin);

        run_shell(
            &dir,
            cmd,
            timeout.unwrap_or_else(|| self.config.command_timeout()),
            venv_bin.as_deref(),
        )
        .await
    }

    /// Resolve to an absolute path and cache key; the path must name an
    /// entry below the sandbox directory.
    fn resolve(&self, rel: &str) -> SandboxResult<(PathBuf, String)> {
        let dir = self.sandbox_dir()?;
        let full = safe_join(&dir, rel)?;
        let key = relative_key(&full, &dir)
            .ok_or_else(|| SandboxError::invalid_path(format!("'{rel}' does not name a file")))?;
        Ok((full, key))
    }

    /// Like [`resolve`](Self::resolve) but the sandbox directory itself is
    /// allowed (empty key).
    fn resolve_any(&self, rel: &str) -> SandboxResult<(PathBuf, String)> {
        let dir = self.sandbox_dir()?;
        let full = safe_join(&dir, rel)?;
        let key = relative_key(&full, &dir).unwrap_or_default();
        Ok((full, key))
    }

    async fn persist(&self) -> SandboxResult<()> {
        match &self.meta {
            Some(meta) => self.storage.write(&[META_KEY], meta).await?,
            None => self.storage.remove(&[META_KEY]).await?,
        }
        self.storage.write(&[CACHE_KEY], &self.cache).await?;
        Ok(())
    }
}

/// Walk `dir` collecting small, non-excluded files. The project venv is
/// skipped along with the excluded directories.
fn walk_workspace(dir: &Path, max_bytes: u64) -> FileCache {
    let mut files = FileCache::new();

    let walker = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        let skip = crate::exclude::EXCLUDED_DIRS.contains(&name.as_ref())
            || (entry.depth() == 1 && name == "venv");
        !skip
    });

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(key) = relative_key(entry.path(), dir) else {
            continue;
        };
        if is_excluded(&key) {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        if size >= max_bytes {
            continue;
        }
        match std::fs::read(entry.path()) {
            Ok(bytes) => {
                files.insert(key, CachedFile::now(String::from_utf8_lossy(&bytes)));
            }
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Skipping unreadable file"),
        }
    }

    files
}
