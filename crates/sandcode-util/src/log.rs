//! Logging setup using tracing.
//!
//! This module provides consistent logging configuration across sandcode.
//! `RUST_LOG` always wins over the configured directives.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a log level from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directives used when `RUST_LOG` is unset
    /// (e.g. `sandcode=debug,tower_http=info`).
    pub directives: String,
    /// Whether to print logs to stderr. Ignored when `file` is set.
    pub print: bool,
    /// Use ANSI colors when printing.
    pub ansi: bool,
    /// Log file path (if any). Logs are appended.
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Configuration that prints every sandcode crate at `level`.
    pub fn for_level(level: LogLevel) -> Self {
        Self {
            directives: crate_directives(level),
            ..Default::default()
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directives: crate_directives(LogLevel::Info),
            print: true,
            ansi: true,
            file: None,
        }
    }
}

/// Build filter directives that apply `level` to all workspace crates and
/// keep HTTP request tracing at info.
pub fn crate_directives(level: LogLevel) -> String {
    let level = level.as_str();
    [
        "sandcode",
        "sandcode_core",
        "sandcode_provider",
        "sandcode_sandbox",
        "sandcode_server",
        "sandcode_storage",
        "sandcode_tools",
    ]
    .iter()
    .map(|krate| format!("{krate}={level}"))
    .chain(std::iter::once("tower_http=info".to_string()))
    .collect::<Vec<_>>()
    .join(",")
}

/// Initialize logging with the given configuration.
///
/// This should be called once at application startup. Returns the log file
/// path when logging to a file. If the file cannot be opened, logging falls
/// back to stderr.
pub fn init(config: LogConfig) -> Option<PathBuf> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.directives));

    let subscriber = tracing_subscriber::registry().with(filter);

    if let Some(path) = config.file {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Warning: Could not create log directory: {e}");
            }
        }
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => {
                let fmt_layer = fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(file);
                subscriber.with(fmt_layer).init();
                return Some(path);
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file: {e}");
            }
        }
        let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        subscriber.with(fmt_layer).init();
        return None;
    }

    if config.print {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_ansi(config.ansi)
            .with_writer(std::io::stderr);
        subscriber.with(fmt_layer).init();
    } else {
        subscriber.init();
    }
    None
}

/// Get the default log file path.
pub fn default_log_path() -> Option<PathBuf> {
    crate::path::data_dir().map(|p| p.join("logs").join("sandcode.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("invalid"), None);
    }

    #[test]
    fn test_log_level_deserializes_lowercase() {
        let level: LogLevel = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
    }

    #[test]
    fn test_crate_directives_cover_workspace() {
        let directives = crate_directives(LogLevel::Debug);
        assert!(directives.contains("sandcode=debug"));
        assert!(directives.contains("sandcode_sandbox=debug"));
        assert!(directives.ends_with("tower_http=info"));
    }

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert!(config.print);
        assert!(config.file.is_none());
        assert!(config.directives.contains("sandcode_core=info"));
    }
}
