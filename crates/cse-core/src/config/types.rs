//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::evaluator::ScoreActivation;
use crate::masking::{Background, MaskPolicy};
use crate::output::OutputFormat;
use crate::ranking::Aggregation;
use crate::subsets::PruneHeuristic;

/// Search controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Smallest prefix size to evaluate
    pub start_n: usize,

    /// Largest prefix size to evaluate (clamped to the number of segments)
    pub stop_n: usize,

    /// Target-class score a subset must reach, in (0, 1]
    pub threshold: f32,

    /// Maximum subsets per classifier call
    pub max_batch_size: usize,

    /// Whether a hit ends generation early
    pub prune_heuristic: PruneHeuristic,

    /// Cap on the number of subsets evaluated per search
    pub evaluation_budget: Option<usize>,

    /// Wall-clock cap per search in milliseconds
    pub time_budget_ms: Option<u64>,

    /// Class to explain when none is given on the command line
    pub target_class: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start_n: 1,
            stop_n: 20,
            threshold: 0.90,
            max_batch_size: 16,
            prune_heuristic: PruneHeuristic::EarlyStop,
            evaluation_budget: None,
            time_budget_ms: None,
            target_class: None,
        }
    }
}

/// Masked-image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Keep the subset visible, or hide it
    pub policy: MaskPolicy,

    /// Fill value for hidden pixels
    pub background: Background,

    /// Build a batch's masked tensors on the rayon pool
    pub parallel: bool,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            policy: MaskPolicy::KeepOnly,
            background: Background::ChannelMean,
            parallel: true,
        }
    }
}

/// Classifier model settings.
///
/// Defaults describe a single-channel 28×28 digit classifier normalized with
/// the MNIST mean and standard deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model file
    pub path: PathBuf,

    /// Square input size in pixels
    pub image_size: u32,

    /// Input channels (1 = grayscale, 3 = RGB)
    pub channels: u32,

    /// Per-channel normalization mean
    pub mean: Vec<f32>,

    /// Per-channel normalization standard deviation
    pub std: Vec<f32>,

    /// Number of output classes
    pub num_classes: usize,

    /// Activation turning raw outputs into scores
    pub activation: ScoreActivation,

    /// Input tensor name (detected from the model when unset)
    pub input_name: Option<String>,

    /// Output tensor name (first output when unset)
    pub output_name: Option<String>,

    /// Skip images whose unmasked prediction is not the target class
    pub require_prediction_match: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.cse/models/classifier.onnx"),
            image_size: 28,
            channels: 1,
            mean: vec![0.1307],
            std: vec![0.3081],
            num_classes: 10,
            activation: ScoreActivation::Softmax,
            input_name: None,
            output_name: None,
            require_prediction_match: true,
        }
    }
}

/// Available segmentation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMethod {
    /// Precomputed label maps stored as `<dir>/<image stem>.csv`
    #[default]
    CsvLabels,
    /// Uniform `grid_cells × grid_cells` partition
    Grid,
}

/// Segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub method: SegmentationMethod,

    /// Directory holding label maps (csv_labels)
    pub dir: String,

    /// Cells per side (grid)
    pub grid_cells: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            method: SegmentationMethod::CsvLabels,
            dir: "./segments".to_string(),
            grid_cells: 5,
        }
    }
}

/// Available attribution providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMethod {
    /// Grayscale saliency image `<dir>/<image stem>.png`
    #[default]
    Heatmap,
    /// Float matrix `<dir>/<image stem>.csv`
    Csv,
}

/// Attribution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub method: AttributionMethod,

    /// Directory holding attribution maps
    pub dir: String,

    /// Reduction from pixels to segments
    pub aggregation: Aggregation,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            method: AttributionMethod::Heatmap,
            dir: "./attributions".to_string(),
            aggregation: Aggregation::Mean,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: OutputFormat,

    /// Pretty-print JSON output
    pub pretty: bool,

    /// Include the per-subset evaluation trace in reports
    pub include_trace: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            pretty: false,
            include_trace: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
