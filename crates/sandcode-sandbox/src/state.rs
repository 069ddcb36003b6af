//! Persisted sandbox state: metadata and the file cache.
//!
//! Both are stored as JSON files in the workspace root and use camelCase keys
//! so existing state files stay readable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage key of the metadata file (`sandbox_meta.json`).
pub const META_KEY: &str = "sandbox_meta";
/// Storage key of the cache file (`sandbox_cache.json`).
pub const CACHE_KEY: &str = "sandbox_cache";

/// Metadata of the active sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxMeta {
    /// Equals the project name.
    pub sandbox_id: String,
    /// Dev-server base URL.
    pub url: String,
    /// RFC 3339 UTC timestamp of the last `init`.
    pub started_at: String,
    pub timeout_ms: u64,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// One cached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedFile {
    pub content: String,
    /// Epoch milliseconds.
    pub last_modified: i64,
}

impl CachedFile {
    /// Cache entry stamped with the current time.
    pub fn now(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            last_modified: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Workspace-relative path (forward slashes) to cached content.
pub type FileCache = BTreeMap<String, CachedFile>;

/// Sorted names of a directory's immediate children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

/// Outcome of a shell command.
///
/// Serializes as `{stdout, stderr, code}` on completion and
/// `{error, stdout, stderr}` on timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn timed_out(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meta_uses_camel_case() {
        let meta = SandboxMeta {
            sandbox_id: "demo".to_string(),
            url: "http://localhost:5173".to_string(),
            started_at: "2024-01-01T00:00:00Z".to_string(),
            timeout_ms: 300_000,
            api_key: None,
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["sandboxId"], "demo");
        assert_eq!(value["timeoutMs"], 300_000);
        assert!(value.get("startedAt").is_some());
    }

    #[test]
    fn test_command_output_shapes() {
        let done = CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            code: Some(1),
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&done).unwrap(),
            json!({"stdout": "", "stderr": "", "code": 1})
        );

        let timed_out = CommandOutput {
            error: Some("Command timed out after 1s".to_string()),
            stdout: "partial\n".to_string(),
            ..Default::default()
        };
        assert!(timed_out.timed_out());
        let value = serde_json::to_value(&timed_out).unwrap();
        assert!(value.get("code").is_none());
        assert_eq!(value["error"], "Command timed out after 1s");
    }
}
