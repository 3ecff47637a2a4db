//! Dialogue glue around the context core
//!
//! Drives the append, complete, append, trim cycle against a chat
//! completion endpoint, one transcript per session.

pub mod client;
pub mod registry;
pub mod session;

pub use client::{Completion, CompletionClient, OpenAiClient, Usage};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{DialogueSession, SessionEvent};
