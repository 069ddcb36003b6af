//! JSON file-based storage implementation.
//!
//! Each key is stored as a separate JSON file under the base path:
//! `["sandbox_meta"]` -> `<base>/sandbox_meta.json`.

use crate::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// JSON file-based storage.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    base_path: PathBuf,
}

impl JsonStorage {
    /// Create a new JSON storage at the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Directory the state files live in.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the file path for a key.
    pub fn key_to_path(&self, key: &[&str]) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::invalid_key("Key cannot be empty"));
        }

        let mut path = self.base_path.clone();
        for component in key {
            let component = sandcode_util::path::validate_segment("key component", component)?;
            path.push(component);
        }
        path.set_extension("json");

        Ok(path)
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Reading state file");

        match fs::read_to_string(&path).await {
            Ok(content) => {
                let value: T = serde_json::from_str(&content)?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Writing state file");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(value)?;

        // Write to a sibling temp file, then rename over the target.
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        debug!(path = %path.display(), "Removing state file");

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct Meta {
        sandbox_id: String,
        timeout_ms: u64,
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        let meta = Meta {
            sandbox_id: "demo".to_string(),
            timeout_ms: 300_000,
        };

        storage.write(&["sandbox_meta"], &meta).await.unwrap();
        assert!(dir.path().join("sandbox_meta.json").exists());
        assert!(!dir.path().join("sandbox_meta.json.tmp").exists());

        let read: Option<Meta> = storage.read(&["sandbox_meta"]).await.unwrap();
        assert_eq!(read, Some(meta));
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        let read: Option<Meta> = storage.read(&["nonexistent"]).await.unwrap();
        assert_eq!(read, None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_previous_value() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        let mut cache = BTreeMap::new();
        cache.insert("a.txt".to_string(), "one".to_string());
        storage.write(&["sandbox_cache"], &cache).await.unwrap();

        cache.clear();
        storage.write(&["sandbox_cache"], &cache).await.unwrap();

        let read: Option<BTreeMap<String, String>> =
            storage.read(&["sandbox_cache"]).await.unwrap();
        assert_eq!(read, Some(BTreeMap::new()));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());

        storage
            .write(&["sandbox_meta"], &Meta::default())
            .await
            .unwrap();
        assert!(storage.exists(&["sandbox_meta"]).await.unwrap());

        storage.remove(&["sandbox_meta"]).await.unwrap();
        assert!(!storage.exists(&["sandbox_meta"]).await.unwrap());

        // Removing twice is fine
        storage.remove(&["sandbox_meta"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path());
        let meta = Meta::default();

        assert!(storage.write(&[], &meta).await.is_err());
        assert!(storage
            .write(&["..", "etc", "passwd"], &meta)
            .await
            .is_err());
        assert!(storage.write(&["path/traversal"], &meta).await.is_err());
    }
}
