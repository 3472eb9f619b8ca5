//! Core data types shared by the search components.
//!
//! These types describe candidate region subsets, what the classifier said
//! about them, and how a search ended.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::masking::MaskPolicy;

/// Identifier of one segment in a [`SegmentMap`](crate::segments::SegmentMap).
pub type SegmentId = u32;

/// Canonical identity of a candidate subset: its ids in ascending order.
///
/// Two subsets holding the same segments share a key regardless of the order
/// the segments were added in. Keys order lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsetKey(Vec<SegmentId>);

impl SubsetKey {
    /// Build a key from ids in any order. Duplicate ids collapse.
    pub fn new(mut ids: Vec<SegmentId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    /// The sorted ids.
    pub fn ids(&self) -> &[SegmentId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A set of segments to keep (or occlude) in one classifier evaluation.
///
/// `ids` preserves the rank order the segments were drawn in; `key` is the
/// canonical sorted form used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SegmentId>", into = "Vec<SegmentId>")]
pub struct CandidateSubset {
    ids: Vec<SegmentId>,
    key: SubsetKey,
}

impl CandidateSubset {
    /// Build a subset from segments in rank order.
    pub fn from_ranked(ids: &[SegmentId]) -> Self {
        Self {
            ids: ids.to_vec(),
            key: SubsetKey::new(ids.to_vec()),
        }
    }

    /// Segment ids in rank order.
    pub fn ids(&self) -> &[SegmentId] {
        &self.ids
    }

    pub fn key(&self) -> &SubsetKey {
        &self.key
    }

    /// Number of distinct segments in the subset.
    pub fn size(&self) -> usize {
        self.key.len()
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.key.0.binary_search(&id).is_ok()
    }

    /// True when every id of `self` is in `other` and `other` has more.
    pub fn is_strict_subset_of(&self, other: &CandidateSubset) -> bool {
        self.size() < other.size() && self.key.0.iter().all(|id| other.contains(*id))
    }

    /// Selection order for the stop rule: smaller subsets first, then the
    /// lexicographically smaller id tuple.
    pub fn selection_cmp(&self, other: &CandidateSubset) -> Ordering {
        self.size()
            .cmp(&other.size())
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl From<Vec<SegmentId>> for CandidateSubset {
    fn from(ids: Vec<SegmentId>) -> Self {
        let key = SubsetKey::new(ids.clone());
        Self { ids, key }
    }
}

impl From<CandidateSubset> for Vec<SegmentId> {
    fn from(subset: CandidateSubset) -> Self {
        subset.ids
    }
}

/// What the classifier reported for one candidate subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// The evaluated subset
    pub subset: CandidateSubset,

    /// Score of the target class after output activation
    pub score: f32,

    /// Arg-max class of the classifier output
    pub predicted_class: usize,
}

/// Why a search ended without crossing the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionReason {
    /// The generator produced no subsets (`start_n` beyond the ranking)
    NoCandidates,
    /// Every subset in range was evaluated
    GeneratorExhausted,
    /// The evaluation-count budget was spent
    BudgetSpent,
    /// The wall-clock budget ran out
    DeadlineReached,
    /// Cancellation was requested between batches
    Cancelled,
}

/// Terminal state of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// A subset reached the threshold
    Hit { winner: EvaluationResult },

    /// No subset reached the threshold
    Exhausted {
        /// Highest-scoring subset seen, for diagnostics
        #[serde(skip_serializing_if = "Option::is_none")]
        best: Option<EvaluationResult>,
        reason: ExhaustionReason,
    },
}

impl SearchOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, SearchOutcome::Hit { .. })
    }

    /// The winning result for a hit, or the best-so-far result otherwise.
    pub fn result(&self) -> Option<&EvaluationResult> {
        match self {
            SearchOutcome::Hit { winner } => Some(winner),
            SearchOutcome::Exhausted { best, .. } => best.as_ref(),
        }
    }
}

/// Counters collected over one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Subsets sent to the classifier
    pub evaluations: usize,

    /// Classifier batches submitted
    pub batches: usize,

    /// Generated subsets dropped because their key was already evaluated
    pub duplicates_skipped: usize,

    /// Wall-clock time spent in the search
    pub elapsed_ms: u64,
}

/// Everything a finished search returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRun {
    pub outcome: SearchOutcome,

    /// Every evaluated subset, in evaluation order
    pub trace: Vec<EvaluationResult>,

    pub stats: SearchStats,
}

/// Report for one explained image, ready for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    // === File Identification ===
    /// Path to the source image
    pub file_path: PathBuf,

    /// Just the filename portion
    pub file_name: String,

    /// BLAKE3 hash of the image file
    pub content_hash: String,

    // === Search Setup ===
    /// Class the explanation targets
    pub target_class: usize,

    /// Target-class score of the unmasked image
    pub unmasked_score: f32,

    /// Predicted class of the unmasked image
    pub unmasked_prediction: usize,

    /// Number of segments in the label map
    pub segment_count: usize,

    pub mask_policy: MaskPolicy,
    pub threshold: f32,

    // === Result ===
    pub outcome: SearchOutcome,

    /// Per-subset evaluations (omitted when disabled in config)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<EvaluationResult>,

    pub stats: SearchStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_key_is_order_independent() {
        let a = CandidateSubset::from_ranked(&[5, 2, 7]);
        let b = CandidateSubset::from_ranked(&[7, 5, 2]);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().ids(), &[2, 5, 7]);
        assert_eq!(a.ids(), &[5, 2, 7]);
    }

    #[test]
    fn test_strict_subset() {
        let small = CandidateSubset::from_ranked(&[5, 2]);
        let large = CandidateSubset::from_ranked(&[5, 2, 7]);
        assert!(small.is_strict_subset_of(&large));
        assert!(!large.is_strict_subset_of(&small));
        assert!(!small.is_strict_subset_of(&small));
    }

    #[test]
    fn test_selection_cmp_prefers_size_then_ids() {
        let a = CandidateSubset::from_ranked(&[9]);
        let b = CandidateSubset::from_ranked(&[1, 2]);
        let c = CandidateSubset::from_ranked(&[1, 3]);
        assert_eq!(a.selection_cmp(&b), Ordering::Less);
        assert_eq!(b.selection_cmp(&c), Ordering::Less);
        assert_eq!(c.selection_cmp(&c), Ordering::Equal);
    }

    #[test]
    fn test_outcome_serializes_with_state_tag() {
        let outcome = SearchOutcome::Exhausted {
            best: None,
            reason: ExhaustionReason::NoCandidates,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"state\":\"exhausted\""));
        assert!(json.contains("\"reason\":\"no_candidates\""));
        assert!(!json.contains("best"));
    }

    #[test]
    fn test_subset_serializes_as_ranked_ids() {
        let subset = CandidateSubset::from_ranked(&[5, 2, 7]);
        let json = serde_json::to_string(&subset).unwrap();
        assert_eq!(json, "[5,2,7]");
        let back: CandidateSubset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key().ids(), &[2, 5, 7]);
    }

    #[test]
    fn test_outcome_result_accessor() {
        let winner = EvaluationResult {
            subset: CandidateSubset::from_ranked(&[1]),
            score: 0.95,
            predicted_class: 3,
        };
        let hit = SearchOutcome::Hit {
            winner: winner.clone(),
        };
        assert!(hit.is_hit());
        assert_eq!(hit.result(), Some(&winner));
    }
}
