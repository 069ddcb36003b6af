//! HTTP server for sandcode.
//!
//! Exposes the chat orchestrator, the chat history store, sandbox lifecycle
//! control and a small file manager over a JSON API.

pub mod error;
pub mod files;
pub mod routes;
pub mod sandbox;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
