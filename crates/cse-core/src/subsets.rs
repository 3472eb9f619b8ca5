//! Candidate subset generation.
//!
//! The search grows a prefix of the ranked segment list one segment at a
//! time, so every candidate contains all the segments of the candidate
//! before it. The generator is a plain iterator over prefix sizes; the
//! controller pulls one batch at a time and may narrow the range once it has
//! an answer.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{CandidateSubset, SegmentId};

/// Policy for cutting the candidate range short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneHeuristic {
    /// Evaluate every prefix size in range, even after a hit
    None,
    /// Abandon generation as soon as a batch produces a hit
    #[default]
    EarlyStop,
}

impl PruneHeuristic {
    /// Whether a hit at some size ends generation.
    pub fn abandons_on_hit(self) -> bool {
        matches!(self, PruneHeuristic::EarlyStop)
    }
}

impl TryFrom<u8> for PruneHeuristic {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PruneHeuristic::None),
            1 => Ok(PruneHeuristic::EarlyStop),
            other => Err(ConfigError::ValidationError(format!(
                "prune heuristic must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Lazy sequence of ranked prefixes with sizes `start_n..=min(stop_n, len)`.
///
/// Restartable by construction: a new generator over the same inputs yields
/// the same sequence.
#[derive(Debug, Clone)]
pub struct PrefixGenerator<'a> {
    ranked: &'a [SegmentId],
    next_size: usize,
    last_size: usize,
    heuristic: PruneHeuristic,
}

impl<'a> PrefixGenerator<'a> {
    pub fn new(
        ranked: &'a [SegmentId],
        start_n: usize,
        stop_n: usize,
        heuristic: PruneHeuristic,
    ) -> Self {
        Self {
            ranked,
            next_size: start_n,
            last_size: stop_n.min(ranked.len()),
            heuristic,
        }
    }

    /// True when no subset would be produced at all.
    pub fn is_empty(&self) -> bool {
        self.next_size > self.last_size
    }

    /// Pull up to `max` subsets.
    pub fn pull(&mut self, max: usize) -> Vec<CandidateSubset> {
        self.by_ref().take(max).collect()
    }

    /// Report a hit at `size`. Under [`PruneHeuristic::EarlyStop`] the range
    /// is narrowed so nothing past `size` is generated; returns whether it was.
    pub fn report_hit(&mut self, size: usize) -> bool {
        if self.heuristic.abandons_on_hit() {
            self.narrow_stop(size);
            true
        } else {
            false
        }
    }

    /// Lower the last prefix size. Never widens the range.
    pub fn narrow_stop(&mut self, stop_n: usize) {
        self.last_size = self.last_size.min(stop_n);
    }

    pub fn heuristic(&self) -> PruneHeuristic {
        self.heuristic
    }
}

impl Iterator for PrefixGenerator<'_> {
    type Item = CandidateSubset;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_size > self.last_size {
            return None;
        }
        let subset = CandidateSubset::from_ranked(&self.ranked[..self.next_size]);
        self.next_size += 1;
        Some(subset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last_size + 1).saturating_sub(self.next_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PrefixGenerator<'_> {}
