//! Conversation context management for chat completion backends
//!
//! The core is [`context::Transcript`]: an ordered list of role-tagged turns
//! with a token-length ledger, trimmed back under a token budget by scored
//! eviction. [`dialogue`] wires it to an OpenAI-compatible completion API.

pub mod config;
pub mod context;
pub mod dialogue;
pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{ContextError, Result};
