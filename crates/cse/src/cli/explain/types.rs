//! CLI enum types for the explain command.

use clap::ValueEnum;
use cse_core::config::{AttributionMethod, SegmentationMethod};
use cse_core::{MaskPolicy, OutputFormat as CoreOutputFormat, PruneHeuristic};

/// Supported output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object, or an array for several images
    Json,
    /// One JSON object per line, streamed as images finish
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Masking policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Show only the selected segments
    KeepOnly,
    /// Hide the selected segments
    Occlude,
}

impl From<Policy> for MaskPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::KeepOnly => MaskPolicy::KeepOnly,
            Policy::Occlude => MaskPolicy::Occlude,
        }
    }
}

/// Pruning heuristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Prune {
    /// Evaluate every prefix size in range
    None,
    /// Stop generating once a batch reaches the threshold
    EarlyStop,
}

impl From<Prune> for PruneHeuristic {
    fn from(prune: Prune) -> Self {
        match prune {
            Prune::None => PruneHeuristic::None,
            Prune::EarlyStop => PruneHeuristic::EarlyStop,
        }
    }
}

/// Segmentation provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Segmenter {
    /// Precomputed label maps (`<dir>/<stem>.csv`)
    CsvLabels,
    /// Uniform grid
    Grid,
}

impl From<Segmenter> for SegmentationMethod {
    fn from(segmenter: Segmenter) -> Self {
        match segmenter {
            Segmenter::CsvLabels => SegmentationMethod::CsvLabels,
            Segmenter::Grid => SegmentationMethod::Grid,
        }
    }
}

/// Attribution provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Attribution {
    /// Grayscale saliency images (`<dir>/<stem>.png`)
    Heatmap,
    /// Float matrices (`<dir>/<stem>.csv`)
    Csv,
}

impl From<Attribution> for AttributionMethod {
    fn from(attribution: Attribution) -> Self {
        match attribution {
            Attribution::Heatmap => AttributionMethod::Heatmap,
            Attribution::Csv => AttributionMethod::Csv,
        }
    }
}
