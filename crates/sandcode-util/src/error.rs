//! Error handling utilities.
//!
//! Validation helpers in this crate report failures through [`Error`], which
//! downstream crates wrap into their own error enums.

use std::fmt;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by the shared utilities.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A name (project, session, key segment) failed validation.
    InvalidName,
    /// A relative path would resolve outside of its base directory.
    PathEscape,
    /// IO operation failed.
    Io,
    /// Serialization/deserialization failed.
    Serialization,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with a source error.
    pub fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidName, message)
    }

    pub fn path_escape(path: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::PathEscape,
            format!("path '{path}' escapes the base directory"),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Io, err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Serialization, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn invalid_name_keeps_message() {
        let err = Error::invalid_name("project name cannot be empty");
        assert_eq!(err.to_string(), "project name cannot be empty");
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(StdError::source(&err).is_none());
    }

    #[test]
    fn path_escape_names_the_path() {
        let err = Error::path_escape("../etc/passwd");
        assert_eq!(err.kind(), ErrorKind::PathEscape);
        assert!(err.to_string().contains("../etc/passwd"));
    }

    #[test]
    fn io_error_converts_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn serde_error_converts() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
