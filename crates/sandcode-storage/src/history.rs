//! Append-only chat history.
//!
//! Layout: `<root>/<project>/<session>.jsonl`, one JSON object per line.
//! Older deployments kept the log inside the workspace at
//! `<workspace_root>/<project>/.ai/<session>.jsonl`; reads fall back to that
//! location when the current file does not exist.

use crate::StorageResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Session used when none (or an unusable name) is given.
pub const DEFAULT_SESSION: &str = "history";

const EXTENSION: &str = "jsonl";

/// A single logged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

impl HistoryEntry {
    /// Create an entry stamped with the current UTC time.
    pub fn now(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
        }
    }
}

/// Chat history store, independent of any sandbox lifetime.
#[derive(Debug, Clone)]
pub struct ChatHistoryStore {
    root: PathBuf,
    legacy_root: Option<PathBuf>,
}

impl ChatHistoryStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            legacy_root: None,
        }
    }

    /// Also read sessions from `<workspace_root>/<project>/.ai/`.
    pub fn with_legacy_root(mut self, workspace_root: impl Into<PathBuf>) -> Self {
        self.legacy_root = Some(workspace_root.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project: &str) -> StorageResult<PathBuf> {
        let project = sandcode_util::path::validate_segment("project", project)?;
        Ok(self.root.join(project))
    }

    fn legacy_dir(&self, project: &str) -> StorageResult<Option<PathBuf>> {
        let project = sandcode_util::path::validate_segment("project", project)?;
        Ok(self
            .legacy_root
            .as_ref()
            .map(|root| root.join(project).join(".ai")))
    }

    fn session_file(session: Option<&str>) -> String {
        format!(
            "{}.{EXTENSION}",
            sandcode_util::path::sanitize_name(session, DEFAULT_SESSION)
        )
    }

    /// Path of the current-location log file for a session.
    pub fn session_path(&self, project: &str, session: Option<&str>) -> StorageResult<PathBuf> {
        Ok(self
            .project_dir(project)?
            .join(Self::session_file(session)))
    }

    /// Append one message to a session.
    pub async fn append(
        &self,
        project: &str,
        role: &str,
        content: &str,
        session: Option<&str>,
    ) -> StorageResult<HistoryEntry> {
        let path = self.session_path(project, session)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let entry = HistoryEntry::now(role, content);
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %path.display(), role = %role, "Appended history entry");
        Ok(entry)
    }

    /// Load a session, optionally keeping only the last `limit` entries.
    ///
    /// Blank and malformed lines are skipped.
    pub async fn load(
        &self,
        project: &str,
        session: Option<&str>,
        limit: Option<usize>,
    ) -> StorageResult<Vec<HistoryEntry>> {
        let path = self.session_path(project, session)?;

        let content = match read_optional(&path).await? {
            Some(content) => Some(content),
            None => match self.legacy_dir(project)? {
                Some(dir) => read_optional(&dir.join(Self::session_file(session))).await?,
                None => None,
            },
        };

        let mut entries: Vec<HistoryEntry> = content
            .as_deref()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed history line");
                    None
                }
            })
            .collect();

        if let Some(limit) = limit {
            if entries.len() > limit {
                entries.drain(..entries.len() - limit);
            }
        }

        Ok(entries)
    }

    /// Delete a session's log in both locations. Missing files are ignored.
    pub async fn clear(&self, project: &str, session: Option<&str>) -> StorageResult<()> {
        remove_optional(&self.session_path(project, session)?).await?;
        if let Some(dir) = self.legacy_dir(project)? {
            remove_optional(&dir.join(Self::session_file(session))).await?;
        }
        Ok(())
    }

    /// Remove a named session.
    pub async fn delete_session(&self, project: &str, session: &str) -> StorageResult<()> {
        self.clear(project, Some(session)).await
    }

    /// Ensure an (empty) session exists. Returns the sanitized session name.
    pub async fn create_session(&self, project: &str, session: &str) -> StorageResult<String> {
        let path = self.session_path(project, Some(session))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(sandcode_util::path::sanitize_name(
            Some(session),
            DEFAULT_SESSION,
        ))
    }

    /// List session names for a project, merged with the legacy location.
    pub async fn list_sessions(&self, project: &str) -> StorageResult<Vec<String>> {
        let mut sessions = BTreeSet::new();
        collect_sessions(&self.project_dir(project)?, &mut sessions).await?;
        if let Some(legacy) = self.legacy_dir(project)? {
            collect_sessions(&legacy, &mut sessions).await?;
        }
        Ok(sessions.into_iter().collect())
    }
}

async fn remove_optional(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Cleared history session");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn read_optional(path: &Path) -> StorageResult<Option<String>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn collect_sessions(dir: &Path, out: &mut BTreeSet<String>) -> StorageResult<()> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == EXTENSION) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                out.insert(stem.to_string());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn append_then_load_returns_single_entry() {
        let dir = tempdir().unwrap();
        let store = ChatHistoryStore::new(dir.path());

        store.append("demo", "user", "hi", Some("s1")).await.unwrap();

        let entries = store.load("demo", Some("s1"), None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].role, "user");
        assert_eq!(entries[0].content, "hi");
        assert!(!entries[0].timestamp.is_empty());
    }

    #[tokio::test]
    async fn clear_then_load_is_empty() {
        let dir = tempdir().unwrap();
        let store = ChatHistoryStore::new(dir.path());

        store.append("demo", "user", "hi", Some("s1")).await.unwrap();
        store.clear("demo", Some("s1")).await.unwrap();

        let entries = store.load("demo", Some("s1"), None).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn load_keeps_tail_window() {
        let dir = tempdir().unwrap();
        let store = ChatHistoryStore::new(dir.path());

        for i in 0..5 {
            store
                .append("demo", "user", &format!("m{i}"), None)
                .await
                .unwrap();
        }

        let entries = store.load("demo", None, Some(2)).await.unwrap();
        let contents: Vec<_> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
        assert!(dir.path().join("demo").join("history.jsonl").exists());
    }

    #[tokio::test]
    async fn load_skips_malformed_lines() {
        let dir = tempdir().unwrap();
        let store = ChatHistoryStore::new(dir.path());
        let path = store.session_path("demo", Some("s1")).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "{\"role\":\"user\",\"content\":\"a\",\"timestamp\":\"t\"}\n\nnot json\n{\"role\":\"assistant\",\"content\":\"b\",\"timestamp\":\"t\"}\n",
        )
        .unwrap();

        let entries = store.load("demo", Some("s1"), None).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].role, "assistant");
    }

    #[tokio::test]
    async fn load_falls_back_to_legacy_location() {
        let history = tempdir().unwrap();
        let workspaces = tempdir().unwrap();
        let legacy_dir = workspaces.path().join("demo").join(".ai");
        std::fs::create_dir_all(&legacy_dir).unwrap();
        std::fs::write(
            legacy_dir.join("old.jsonl"),
            "{\"role\":\"user\",\"content\":\"legacy\",\"timestamp\":\"t\"}\n",
        )
        .unwrap();

        let store = ChatHistoryStore::new(history.path()).with_legacy_root(workspaces.path());
        let entries = store.load("demo", Some("old"), None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "legacy");

        store.create_session("demo", "fresh").await.unwrap();
        let sessions = store.list_sessions("demo").await.unwrap();
        assert_eq!(sessions, vec!["fresh".to_string(), "old".to_string()]);
    }

    #[tokio::test]
    async fn clear_removes_legacy_session_too() {
        let history = tempdir().unwrap();
        let workspaces = tempdir().unwrap();
        let legacy_dir = workspaces.path().join("demo").join(".ai");
        std::fs::create_dir_all(&legacy_dir).unwrap();
        std::fs::write(
            legacy_dir.join("s1.jsonl"),
            "{\"role\":\"user\",\"content\":\"old\",\"timestamp\":\"t\"}\n",
        )
        .unwrap();

        let store = ChatHistoryStore::new(history.path()).with_legacy_root(workspaces.path());
        store.append("demo", "user", "new", Some("s1")).await.unwrap();
        store.clear("demo", Some("s1")).await.unwrap();

        assert!(store.load("demo", Some("s1"), None).await.unwrap().is_empty());
        assert!(!legacy_dir.join("s1.jsonl").exists());
        assert!(store.list_sessions("demo").await.unwrap().is_empty());

        // Legacy-only sessions are deleted as well.
        std::fs::write(legacy_dir.join("s2.jsonl"), "").unwrap();
        store.delete_session("demo", "s2").await.unwrap();
        assert!(!legacy_dir.join("s2.jsonl").exists());
    }

    #[tokio::test]
    async fn session_names_are_sanitized() {
        let dir = tempdir().unwrap();
        let store = ChatHistoryStore::new(dir.path());

        let name = store.create_session("demo", "../evil name").await.unwrap();
        assert_eq!(name, "evilname");
        assert!(dir.path().join("demo").join("evilname.jsonl").exists());

        store.delete_session("demo", "../evil name").await.unwrap();
        assert!(store.list_sessions("demo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_project_is_rejected() {
        let dir = tempdir().unwrap();
        let store = ChatHistoryStore::new(dir.path());
        assert!(store.append("..", "user", "x", None).await.is_err());
        assert!(store.list_sessions("").await.is_err());
    }
}
