//! Shared utilities for sandcode.
//!
//! This crate provides common utilities used across the sandcode workspace:
//! - A small error type for input validation and IO failures
//! - Logging setup with tracing
//! - Path utilities (traversal-safe joins, name validation and sanitizing)
//! - Text truncation helpers for logs and error messages

pub mod error;
pub mod log;
pub mod path;
pub mod text;

pub use error::{Error, ErrorKind, Result};
pub use text::truncate_chars;
