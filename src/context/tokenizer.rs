//! Token counting using tiktoken

use crate::error::{ContextError, Result};
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};

/// Token counting capability for a specific model encoding
pub trait Tokenizer: Send + Sync {
    /// Count the tokens in the given text
    fn count(&self, text: &str) -> usize;

    /// Count tokens for multiple texts
    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.count(t)).collect()
    }
}

/// Tiktoken-based tokenizer resolved from a model name
#[derive(Clone)]
pub struct TiktokenTokenizer {
    bpe: Arc<CoreBPE>,
    encoding: String,
}

impl TiktokenTokenizer {
    /// Create a tokenizer using the encoding registered for `model`
    /// (e.g. `gpt-3.5-turbo`, `gpt-4`).
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = get_bpe_from_model(model).map_err(|e| ContextError::Tokenizer {
            model: model.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bpe: Arc::new(bpe),
            encoding: model.to_string(),
        })
    }

    /// Create a tokenizer with the cl100k_base encoding
    pub fn cl100k() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| ContextError::Tokenizer {
            model: "cl100k_base".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bpe: Arc::new(bpe),
            encoding: "cl100k_base".to_string(),
        })
    }

    /// Model or encoding name this tokenizer was built for
    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// Counts one token per Unicode scalar value.
///
/// Deterministic and dependency-free; useful where exact BPE counts do not
/// matter, such as tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCountTokenizer;

impl Tokenizer for CharCountTokenizer {
    fn count(&self, text: &str) -> usize {
        text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiktoken_for_model() {
        let tokenizer = TiktokenTokenizer::for_model("gpt-3.5-turbo").unwrap();
        let tokens = tokenizer.count("Hello, world! This is a test.");
        assert!(tokens > 0);
        assert!(tokens < 20);
    }

    #[test]
    fn test_unknown_model_is_an_error() {
        let err = TiktokenTokenizer::for_model("no-such-model-xyz").unwrap_err();
        assert!(matches!(err, ContextError::Tokenizer { ref model, .. } if model == "no-such-model-xyz"));
    }

    #[test]
    fn test_empty_text_has_no_tokens() {
        let tokenizer = TiktokenTokenizer::cl100k().unwrap();
        assert_eq!(tokenizer.count(""), 0);
    }

    #[test]
    fn test_char_count_tokenizer() {
        let tokenizer = CharCountTokenizer;
        assert_eq!(tokenizer.count("héllo"), 5);
        assert_eq!(tokenizer.count_batch(&["ab", "", "xyz"]), vec![2, 0, 3]);
    }
}
