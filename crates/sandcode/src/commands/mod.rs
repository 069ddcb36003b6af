//! Command handlers for the sandcode CLI.

pub mod chat;
pub mod history;
pub mod sandbox;
pub mod serve;

pub use chat::*;
pub use history::*;
pub use sandbox::*;
pub use serve::*;
