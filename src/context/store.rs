//! Transcript storage: ordered turns plus their token-length ledger

use super::eviction::{self, EvictionConfig, TrimReport};
use super::models::{Role, Turn};
use super::tokenizer::Tokenizer;
use crate::error::{ContextError, Result};

/// Ordered conversation turns with a positionally aligned token ledger.
///
/// `lengths[i]` is the token length of `turns[i]`. Both vectors only change
/// together, through [`Transcript::append`], [`Transcript::trim`] and
/// [`Transcript::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
    lengths: Vec<usize>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn with its caller-supplied token length
    pub fn append(&mut self, role: Role, content: impl Into<String>, token_length: usize) {
        self.turns.push(Turn::new(role, content));
        self.lengths.push(token_length);
    }

    /// Drop every turn, keeping the transcript usable for a new session
    pub fn clear(&mut self) {
        self.turns.clear();
        self.lengths.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Sum of the ledger entries
    pub fn ledger_total(&self) -> usize {
        self.lengths.iter().sum()
    }

    /// Bring the transcript back within `max_context` tokens.
    ///
    /// `current_total` is the authoritative total reported for the last
    /// exchange; it may exceed [`Self::ledger_total`]. When it is already
    /// within budget the transcript is left untouched.
    pub fn trim(
        &mut self,
        current_total: usize,
        max_context: usize,
        tokenizer: &dyn Tokenizer,
        config: &EvictionConfig,
    ) -> Result<TrimReport> {
        self.check_alignment()?;
        eviction::trim(
            &mut self.turns,
            &mut self.lengths,
            current_total,
            max_context,
            tokenizer,
            config,
        )
    }

    fn check_alignment(&self) -> Result<()> {
        if self.turns.len() != self.lengths.len() {
            return Err(ContextError::InvariantViolation {
                turns: self.turns.len(),
                lengths: self.lengths.len(),
            });
        }
        Ok(())
    }
}
