//! Error types for context management and the dialogue glue

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors raised by the transcript, the tokenizer adapter and the completion client
#[derive(Debug, Error)]
pub enum ContextError {
    /// Turns and ledger went out of step. Programming error, never repaired.
    #[error("Invariant violation: {turns} turns but {lengths} ledger entries")]
    InvariantViolation { turns: usize, lengths: usize },

    #[error("Context cannot be shrunk below budget: {remaining} tokens remain, {max} allowed")]
    ContextUnshrinkable { remaining: usize, max: usize },

    #[error("Tokenizer unavailable for model '{model}': {reason}")]
    Tokenizer { model: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unshrinkable_message() {
        let err = ContextError::ContextUnshrinkable { remaining: 600, max: 500 };
        assert_eq!(
            err.to_string(),
            "Context cannot be shrunk below budget: 600 tokens remain, 500 allowed"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: ContextError = config::ConfigError::Message("bad value".to_string()).into();
        assert!(matches!(err, ContextError::Configuration(ref m) if m.contains("bad value")));
    }
}
