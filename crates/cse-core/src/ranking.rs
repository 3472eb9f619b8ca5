//! Segment ranking by attribution score.
//!
//! An external saliency method scores every pixel (or every segment). The
//! ranker reduces those scores to one value per segment and orders segment
//! ids so the most salient come first.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{SearchError, SearchResult};
use crate::segments::SegmentMap;
use crate::types::SegmentId;

/// Per-segment attribution scores.
pub type AttributionScores = BTreeMap<SegmentId, f32>;

/// How per-pixel attribution values reduce to one score per segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Average over the segment's pixels
    #[default]
    Mean,
    /// Sum over the segment's pixels (favours large segments)
    Sum,
    /// Peak value inside the segment
    Max,
}

/// Order segment ids by score descending, ties by id ascending.
///
/// Fails if the map is empty or any score is NaN or infinite.
pub fn rank(scores: &AttributionScores) -> SearchResult<Vec<SegmentId>> {
    if scores.is_empty() {
        return Err(SearchError::invalid("attribution scores are empty"));
    }
    if let Some((id, score)) = scores.iter().find(|(_, s)| !s.is_finite()) {
        return Err(SearchError::invalid(format!(
            "attribution score for segment {id} is not finite ({score})"
        )));
    }

    let mut entries: Vec<(SegmentId, f32)> = scores.iter().map(|(&id, &s)| (id, s)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(entries.into_iter().map(|(id, _)| id).collect())
}

/// Rank scores after checking they describe exactly the segments of `map`.
pub fn rank_for_map(scores: &AttributionScores, map: &SegmentMap) -> SearchResult<Vec<SegmentId>> {
    if let Some(id) = scores.keys().find(|id| !map.contains(**id)) {
        return Err(SearchError::invalid(format!(
            "attribution score given for segment {id}, which is not in the segment map"
        )));
    }
    if let Some(id) = map.segment_ids().iter().find(|id| !scores.contains_key(id)) {
        return Err(SearchError::invalid(format!(
            "segment {id} has no attribution score"
        )));
    }
    rank(scores)
}

/// Reduce a per-pixel attribution map to per-segment scores.
pub fn aggregate(
    map: &SegmentMap,
    attribution: &Array2<f32>,
    aggregation: Aggregation,
) -> SearchResult<AttributionScores> {
    if attribution.dim() != map.shape() {
        return Err(SearchError::invalid(format!(
            "attribution map shape {:?} does not match segment map shape {:?}",
            attribution.dim(),
            map.shape()
        )));
    }

    // (sum, max, count) per label
    let mut acc: BTreeMap<SegmentId, (f64, f32, usize)> = BTreeMap::new();
    for (&label, &value) in map.labels().iter().zip(attribution.iter()) {
        let entry = acc.entry(label).or_insert((0.0, f32::NEG_INFINITY, 0));
        entry.0 += f64::from(value);
        entry.1 = entry.1.max(value);
        entry.2 += 1;
    }

    Ok(acc
        .into_iter()
        .map(|(id, (sum, max, count))| {
            let score = match aggregation {
                Aggregation::Mean => (sum / count as f64) as f32,
                Aggregation::Sum => sum as f32,
                Aggregation::Max => max,
            };
            (id, score)
        })
        .collect())
}
