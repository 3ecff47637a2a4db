//! Scored eviction for transcripts over their token budget
//!
//! Trimming runs in two phases:
//! - Phase A drops whole turns from the oldest end while the transcript holds
//!   more than `max_keep_turns` turns, stopping early once within budget.
//! - Phase B ranks the remaining turns by a deletion score and cuts a prefix
//!   off each candidate in turn until the total fits.
//!
//! The deletion score of turn `i` in a transcript of `n` turns is
//!
//! ```text
//! (distance * distance_weight + length / max_context * length_weight) * role_factor
//! ```
//!
//! with `distance = n - 1 - i` and `role_factor = role_weight * system_role_ratio`
//! for assistant turns, `role_weight` otherwise.

use super::models::{Role, Turn};
use super::tokenizer::Tokenizer;
use crate::error::{ContextError, Result};
use crate::metrics::METRICS;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Extra characters cut on proportional deletions, covering the trailing
/// newline token.
const NEWLINE_EPSILON: usize = 2;

/// Tunables for [`trim`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Weight of a turn's distance from the newest turn
    #[serde(default = "default_distance_weight")]
    pub distance_weight: f64,

    /// Weight of a turn's length relative to the budget
    #[serde(default = "default_length_weight")]
    pub length_weight: f64,

    #[serde(default = "default_role_weight")]
    pub role_weight: f64,

    /// Multiplier on `role_weight` for assistant turns
    #[serde(default = "default_system_role_ratio")]
    pub system_role_ratio: f64,

    /// Largest fraction of one turn's content removed per deletion
    #[serde(default = "default_delete_ratio")]
    pub delete_ratio: f64,

    /// Hard cap on the number of turns kept
    #[serde(default = "default_max_keep_turns")]
    pub max_keep_turns: usize,
}

fn default_distance_weight() -> f64 { 0.05 }
fn default_length_weight() -> f64 { 0.4 }
fn default_role_weight() -> f64 { 1.0 }
fn default_system_role_ratio() -> f64 { 3.0 }
fn default_delete_ratio() -> f64 { 0.4 }
fn default_max_keep_turns() -> usize { 30 }

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            distance_weight: default_distance_weight(),
            length_weight: default_length_weight(),
            role_weight: default_role_weight(),
            system_role_ratio: default_system_role_ratio(),
            delete_ratio: default_delete_ratio(),
            max_keep_turns: default_max_keep_turns(),
        }
    }
}

impl EvictionConfig {
    /// Validate that the tunables describe a usable policy
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("distance_weight", self.distance_weight),
            ("length_weight", self.length_weight),
            ("role_weight", self.role_weight),
            ("system_role_ratio", self.system_role_ratio),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ContextError::Configuration(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !(self.delete_ratio > 0.0 && self.delete_ratio <= 1.0) {
            return Err(ContextError::Configuration(format!(
                "delete_ratio must be in (0, 1], got {}",
                self.delete_ratio
            )));
        }

        Ok(())
    }
}

/// Outcome of a successful trim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrimReport {
    /// Whole turns removed from the front
    pub evicted_turns: usize,
    /// Prefix deletions applied to individual turns
    pub partial_deletions: usize,
    /// Running total after trimming
    pub remaining_total: usize,
}

/// Deletion score of every turn, index-aligned with `turns`
pub fn deletion_scores(
    turns: &[Turn],
    lengths: &[usize],
    max_context: usize,
    config: &EvictionConfig,
) -> Vec<f64> {
    let count = turns.len();
    let budget = max_context.max(1) as f64;
    let assistant_weight = config.role_weight * config.system_role_ratio;

    turns
        .iter()
        .zip(lengths)
        .enumerate()
        .map(|(index, (turn, &length))| {
            let distance = (count - 1 - index) as f64;
            let role_factor = match turn.role {
                Role::Assistant => assistant_weight,
                Role::User | Role::System => config.role_weight,
            };
            (distance * config.distance_weight + length as f64 / budget * config.length_weight)
                * role_factor
        })
        .collect()
}

/// Turn indices ordered from most to least eligible for deletion.
/// Ties keep chronological order.
pub fn rank_candidates(
    turns: &[Turn],
    lengths: &[usize],
    max_context: usize,
    config: &EvictionConfig,
) -> Vec<usize> {
    let scores = deletion_scores(turns, lengths, max_context, config);
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    ranked.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    ranked
}

/// Number of leading characters to cut from a candidate turn
fn deletion_point(char_len: usize, exceed: usize, length: usize, delete_ratio: f64) -> usize {
    let ratio = exceed as f64 / length as f64;
    let cut = if ratio < delete_ratio {
        (ratio * char_len as f64) as usize + NEWLINE_EPSILON
    } else {
        (delete_ratio * char_len as f64) as usize
    };
    cut.min(char_len)
}

/// Remove the first `chars` characters of `content` in place
fn cut_prefix(content: &mut String, chars: usize) {
    let offset = content
        .char_indices()
        .nth(chars)
        .map_or(content.len(), |(index, _)| index);
    content.drain(..offset);
}

/// Restore `turns`/`lengths` to within `max_context` tokens.
///
/// Both slices must be the same length. Deletions already applied stay
/// applied when [`ContextError::ContextUnshrinkable`] is returned.
pub(crate) fn trim(
    turns: &mut Vec<Turn>,
    lengths: &mut Vec<usize>,
    current_total: usize,
    max_context: usize,
    tokenizer: &dyn Tokenizer,
    config: &EvictionConfig,
) -> Result<TrimReport> {
    let mut report = TrimReport {
        remaining_total: current_total,
        ..TrimReport::default()
    };
    if current_total <= max_context {
        return Ok(report);
    }

    METRICS.record_trim();
    debug!(
        "Trimming {} turns: total={}, max_context={}",
        turns.len(),
        current_total,
        max_context
    );

    // Phase A: hard cap on turn count, oldest first
    let mut total = current_total;
    let mut evict = 0;
    while turns.len() - evict > config.max_keep_turns {
        total = total.saturating_sub(lengths[evict]);
        evict += 1;
        if total <= max_context {
            break;
        }
    }
    if evict > 0 {
        turns.drain(..evict);
        lengths.drain(..evict);
        report.evicted_turns = evict;
        METRICS.record_evictions(evict);
        debug!("Evicted {} oldest turns, total now {}", evict, total);
    }

    if total <= max_context {
        report.remaining_total = total;
        info!(
            "Trimmed context to {} tokens by evicting {} turns",
            total, report.evicted_turns
        );
        return Ok(report);
    }

    // Phase B: scored prefix deletion
    let ranked = rank_candidates(turns, lengths, max_context, config);
    for index in ranked {
        if total <= max_context {
            break;
        }

        let length = lengths[index];
        if length == 0 {
            debug!("Skipping exhausted turn {}", index);
            continue;
        }

        let exceed = total - max_context;
        let content = &mut turns[index].content;
        let cut = deletion_point(content.chars().count(), exceed, length, config.delete_ratio);
        cut_prefix(content, cut);

        let new_length = tokenizer.count(content);
        total = total.saturating_sub(length).saturating_add(new_length);
        lengths[index] = new_length;
        report.partial_deletions += 1;
        METRICS.record_partial_deletion();

        debug!(
            "Cut {} chars from turn {} ({} -> {} tokens), total now {}",
            cut, index, length, new_length, total
        );
    }

    report.remaining_total = total;
    if total > max_context {
        METRICS.record_unshrinkable();
        warn!(
            "Context still over budget after trimming: {} > {}",
            total, max_context
        );
        return Err(ContextError::ContextUnshrinkable {
            remaining: total,
            max: max_context,
        });
    }

    info!(
        "Trimmed context to {} tokens ({} turns evicted, {} partial deletions)",
        total, report.evicted_turns, report.partial_deletions
    );
    Ok(report)
}
