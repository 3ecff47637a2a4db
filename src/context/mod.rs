//! Conversation context management with token budget enforcement
//!
//! A [`Transcript`] keeps the ordered turns of one conversation together
//! with a token-length ledger, and trims itself back under a token budget
//! using the scored eviction in [`eviction`].

pub mod eviction;
pub mod models;
pub mod store;
pub mod tokenizer;

pub use eviction::{EvictionConfig, TrimReport};
pub use models::{Role, Turn};
pub use store::Transcript;
pub use tokenizer::{CharCountTokenizer, TiktokenTokenizer, Tokenizer};
