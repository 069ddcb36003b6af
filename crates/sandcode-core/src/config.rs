//! Configuration management.
//!
//! Supports multiple configuration sources with merging:
//! 1. Global config (`~/.config/sandcode/config.json`)
//! 2. `SANDCODE_CONFIG_CONTENT` environment variable
//! 3. Project config (`sandcode.json` or `sandcode.jsonc` in the working directory)
//! 4. An explicit file and CLI flags, applied by the caller
//!
//! Files are JSONC and support `{env:VAR}` and `{file:path}` substitution.

use crate::catalog::{ModelCatalog, ModelEntry};
use crate::error::{ConfigError, CoreResult};
use crate::policy::PolicyConfig;
use sandcode_provider::{ProviderKind, ProviderSettings};
use sandcode_sandbox::SandboxConfig;
use sandcode_util::log::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable holding inline configuration.
pub const CONFIG_CONTENT_ENV: &str = "SANDCODE_CONFIG_CONTENT";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Static regex for variable substitution, compiled once.
static VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

/// Get the variable substitution regex, compiling it once on first use.
fn var_regex() -> &'static regex::Regex {
    VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\{(env|file):([^}]+)\}")
            .expect("Invalid regex pattern - this is a compile-time constant")
    })
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON Schema reference.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    /// HTTP server settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Sandbox settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxSection>,

    /// Chat history settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,

    /// Task-mode heuristics and iteration caps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyConfig>,

    /// Provider configurations keyed by provider ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<HashMap<String, ProviderConfig>>,

    /// Extra model labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<HashMap<String, ModelEntry>>,

    /// Label used when a request names no model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Server port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Allowed CORS origins. Unset or `["*"]` allows any origin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_origins: Option<Vec<String>>,
}

/// Sandbox configuration. Unset fields keep the sandbox defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_host: Option<String>,

    /// Install command argv.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_command: Option<Vec<String>>,

    /// Dev server argv; `{port}` is replaced with the dev port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_command: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cache_file_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_grace_secs: Option<u64>,
}

impl SandboxSection {
    /// Merge another section into this one (other takes precedence).
    pub fn merge(self, other: Self) -> Self {
        Self {
            workspace_root: other.workspace_root.or(self.workspace_root),
            dev_port: other.dev_port.or(self.dev_port),
            dev_host: other.dev_host.or(self.dev_host),
            install_command: other.install_command.or(self.install_command),
            dev_command: other.dev_command.or(self.dev_command),
            python: other.python.or(self.python),
            max_cache_file_bytes: other.max_cache_file_bytes.or(self.max_cache_file_bytes),
            command_timeout_secs: other.command_timeout_secs.or(self.command_timeout_secs),
            kill_grace_secs: other.kill_grace_secs.or(self.kill_grace_secs),
        }
    }
}

/// Chat history configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Directory holding `<project>/<session>.jsonl` files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key. Supports `{env:VAR}` substitution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Loading order (later sources override earlier):
    /// 1. Global config from `~/.config/sandcode/`
    /// 2. `SANDCODE_CONFIG_CONTENT` environment variable
    /// 3. Project config from `project_dir`
    pub async fn load(project_dir: Option<&Path>) -> CoreResult<(Self, Vec<PathBuf>)> {
        let mut config = Config::default();
        let mut sources = Vec::new();

        // 1. Load global config
        if let Some(global_dir) = Self::global_config_dir() {
            for name in &["config.json", "sandcode.json", "sandcode.jsonc"] {
                let path = global_dir.join(name);
                if path.exists() {
                    let loaded = Self::load_file(&path).await?;
                    config = config.merge(loaded);
                    sources.push(path);
                    break;
                }
            }
        }

        // 2. Load from environment variable
        if let Ok(content) = std::env::var(CONFIG_CONTENT_ENV) {
            let loaded = Self::parse_jsonc(&content, "<env>")?;
            config = config.merge(loaded);
        }

        // 3. Load project config
        if let Some(dir) = project_dir {
            for name in &["sandcode.jsonc", "sandcode.json"] {
                let path = dir.join(name);
                if path.exists() {
                    let loaded = Self::load_file(&path).await?;
                    config = config.merge(loaded);
                    sources.push(path);
                    break;
                }
            }
        }

        Ok((config, sources))
    }

    /// Get the global config directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        sandcode_util::path::config_dir()
    }

    /// Load configuration from a file.
    pub async fn load_file(path: &Path) -> CoreResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let content = Self::substitute_variables(&content, path)?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Parse JSONC (JSON with comments).
    pub fn parse_jsonc(content: &str, source: &str) -> CoreResult<Self> {
        let stripped = Self::strip_comments(content);

        serde_json::from_str(&stripped).map_err(|e| {
            ConfigError::InvalidJson {
                path: source.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Strip JSON comments.
    fn strip_comments(input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut in_string = false;
        let mut escape_next = false;

        while let Some(c) = chars.next() {
            if escape_next {
                result.push(c);
                escape_next = false;
                continue;
            }

            if c == '\\' && in_string {
                result.push(c);
                escape_next = true;
                continue;
            }

            if c == '"' {
                in_string = !in_string;
                result.push(c);
                continue;
            }

            if in_string {
                result.push(c);
                continue;
            }

            if c == '/' {
                match chars.peek() {
                    Some('/') => {
                        chars.next();
                        for c in chars.by_ref() {
                            if c == '\n' {
                                result.push('\n');
                                break;
                            }
                        }
                        continue;
                    }
                    Some('*') => {
                        chars.next();
                        let mut prev = ' ';
                        for c in chars.by_ref() {
                            if prev == '*' && c == '/' {
                                break;
                            }
                            // Keep line numbers stable for error messages
                            if c == '\n' {
                                result.push('\n');
                            }
                            prev = c;
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            result.push(c);
        }

        result
    }

    /// Substitute variables in config content.
    ///
    /// Supports:
    /// - `{env:VAR_NAME}` - Environment variable
    /// - `{file:path}` - File contents (relative to config file), trimmed
    fn substitute_variables(content: &str, config_path: &Path) -> CoreResult<String> {
        let re = var_regex();
        let config_dir = config_path.parent().unwrap_or(Path::new("."));

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let (Some(full_match), Some(kind), Some(value)) = (cap.get(0), cap.get(1), cap.get(2))
            else {
                continue;
            };
            let value = value.as_str();

            let replacement = match kind.as_str() {
                "env" => std::env::var(value).map_err(|_| ConfigError::EnvVarNotFound {
                    name: value.to_string(),
                })?,
                "file" => {
                    let file_path = config_dir.join(value);
                    std::fs::read_to_string(&file_path)
                        .map(|v| v.trim().to_string())
                        .map_err(|_| ConfigError::FileRefNotFound {
                            path: file_path.display().to_string(),
                        })?
                }
                _ => continue,
            };

            result = result.replace(full_match.as_str(), &replacement);
        }

        Ok(result)
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(mut self, other: Self) -> Self {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.default_model.is_some() {
            self.default_model = other.default_model;
        }

        self.server = match (self.server, other.server) {
            (Some(base), Some(other)) => Some(ServerConfig {
                host: other.host.or(base.host),
                port: other.port.or(base.port),
                cors_origins: other.cors_origins.or(base.cors_origins),
            }),
            (base, None) => base,
            (None, other) => other,
        };
        self.sandbox = match (self.sandbox, other.sandbox) {
            (Some(base), Some(other)) => Some(base.merge(other)),
            (base, None) => base,
            (None, other) => other,
        };
        self.history = merge_option(self.history, other.history);
        self.policy = merge_option(self.policy, other.policy);

        self.provider = merge_hashmap(self.provider, other.provider);
        self.models = merge_hashmap(self.models, other.models);

        self
    }

    /// Effective sandbox configuration.
    pub fn sandbox_config(&self) -> SandboxConfig {
        let mut config = SandboxConfig::default();
        let Some(section) = &self.sandbox else {
            return config;
        };

        if let Some(root) = &section.workspace_root {
            config.workspace_root = root.clone();
        }
        if let Some(port) = section.dev_port {
            config.dev_port = port;
        }
        if let Some(host) = &section.dev_host {
            config.dev_host = host.clone();
        }
        if let Some(command) = &section.install_command {
            config.install_command = command.clone();
        }
        if let Some(command) = &section.dev_command {
            config.dev_command = command.clone();
        }
        if let Some(python) = &section.python {
            config.python = python.clone();
        }
        if let Some(bytes) = section.max_cache_file_bytes {
            config.max_cache_file_bytes = bytes;
        }
        if let Some(secs) = section.command_timeout_secs {
            config.command_timeout_secs = secs;
        }
        if let Some(secs) = section.kill_grace_secs {
            config.kill_grace_secs = secs;
        }
        config
    }

    /// Directory of the chat history store.
    pub fn history_root(&self) -> PathBuf {
        self.history
            .as_ref()
            .and_then(|h| h.root.clone())
            .unwrap_or_else(|| PathBuf::from("./chat_histories"))
    }

    /// `host:port` the server binds to.
    pub fn server_address(&self) -> String {
        let server = self.server.clone().unwrap_or_default();
        format!(
            "{}:{}",
            server.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            server.port.unwrap_or(DEFAULT_PORT)
        )
    }

    /// Allowed CORS origins; empty means any.
    pub fn cors_origins(&self) -> Vec<String> {
        self.server
            .as_ref()
            .and_then(|s| s.cors_origins.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|origin| origin != "*")
            .collect()
    }

    /// Effective task policy.
    pub fn policy(&self) -> PolicyConfig {
        self.policy.clone().unwrap_or_default()
    }

    /// Model catalog with configured labels and default.
    pub fn catalog(&self) -> ModelCatalog {
        let mut catalog = ModelCatalog::builtin();
        if let Some(models) = &self.models {
            catalog = catalog.with_entries(models.clone());
        }
        if let Some(label) = &self.default_model {
            catalog = catalog.with_default(label);
        }
        catalog
    }

    /// Connection settings for a provider.
    pub fn provider_settings(&self, kind: ProviderKind) -> ProviderSettings {
        let mut settings = ProviderSettings::default();
        let Some(config) = self
            .provider
            .as_ref()
            .and_then(|providers| providers.get(kind.as_str()))
        else {
            return settings;
        };

        settings.api_key = config.api_key.clone();
        settings.base_url = config.base_url.clone();
        if let Some(ms) = config.timeout_ms {
            settings.timeout = Duration::from_millis(ms);
        }
        settings
    }
}

/// Merge two Option values.
fn merge_option<T>(base: Option<T>, other: Option<T>) -> Option<T> {
    match (base, other) {
        (_, Some(o)) => Some(o),
        (b, None) => b,
    }
}

/// Merge two HashMaps.
fn merge_hashmap<K: std::hash::Hash + Eq, V>(
    base: Option<HashMap<K, V>>,
    other: Option<HashMap<K, V>>,
) -> Option<HashMap<K, V>> {
    match (base, other) {
        (Some(mut b), Some(o)) => {
            b.extend(o);
            Some(b)
        }
        (b, None) => b,
        (None, o) => o,
    }
}
