//! Core logic for sandcode.
//!
//! This crate ties the other crates together:
//! - Configuration management (multi-source, JSONC support)
//! - The model catalog and task policy
//! - Reply classification into tool-call shapes
//! - The chat orchestration loop

pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod shape;

pub use catalog::{ModelCatalog, ModelEntry, DEFAULT_MODEL_LABEL};
pub use config::Config;
pub use error::{ConfigError, CoreError, CoreResult};
pub use orchestrator::{
    ChatOutcome, ChatRequest, EnvProviderFactory, Orchestrator, ProviderFactory, DEFAULT_PROJECT,
};
pub use policy::{PolicyConfig, TaskMode};
pub use shape::{ResponseShape, ToolInvocation};
