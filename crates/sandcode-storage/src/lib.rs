//! Storage layer for sandcode.
//!
//! Two kinds of persistence live here:
//! - JSON state files written atomically (sandbox metadata and file cache)
//! - An append-only, line-delimited chat history partitioned by project and session

pub mod error;
pub mod history;
pub mod json;

pub use error::{StorageError, StorageResult};
pub use history::{ChatHistoryStore, HistoryEntry, DEFAULT_SESSION};
pub use json::JsonStorage;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A trait for key-value storage backends.
///
/// Keys are represented as path segments, e.g., `["sandbox_meta"]`.
/// Values are serialized/deserialized as JSON.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value from storage.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>>;

    /// Write a value to storage, replacing any previous value.
    async fn write<T: Serialize + Send + Sync>(&self, key: &[&str], value: &T)
        -> StorageResult<()>;

    /// Remove a value from storage. Removing a missing key is not an error.
    async fn remove(&self, key: &[&str]) -> StorageResult<()>;

    /// Check if a key exists.
    async fn exists(&self, key: &[&str]) -> StorageResult<bool>;
}
