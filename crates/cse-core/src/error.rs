//! Error types for the counterfactual search engine.
//!
//! Errors are split by layer: configuration, the search core itself, and the
//! adapters that load images, label maps, attribution maps and models. Each
//! variant carries the context needed to act on it (file paths, the offending
//! value, or the candidate subsets of an aborted batch).

use std::path::PathBuf;
use thiserror::Error;

use crate::types::SubsetKey;

/// Top-level error type for CSE operations.
#[derive(Error, Debug)]
pub enum CseError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised by the search core
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Errors loading inputs (images, label maps, attribution maps, models)
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised by the search core.
///
/// Exhausting the candidate range or the budget is not an error; those end
/// the search in the exhausted state instead.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Malformed ranking input or search parameters. Raised before any
    /// classifier call and never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A classifier batch failed or produced output of the wrong shape.
    #[error("Inference failed for {} candidate(s): {message}", candidates.len())]
    Inference {
        message: String,
        /// Keys of every subset in the aborted batch
        candidates: Vec<SubsetKey>,
    },
}

impl SearchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Failure reported by a [`Classifier`](crate::classifier::Classifier) forward pass.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The runtime failed while executing the model
    #[error("Classifier runtime failure: {0}")]
    Runtime(String),

    /// The model session could not be used (poisoned lock, bad tensor)
    #[error("Classifier session error: {0}")]
    Session(String),
}

/// Errors loading the inputs of a search from disk.
#[derive(Error, Debug)]
pub enum InputError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Segment label map could not be produced or parsed
    #[error("Segmentation failed for {path}: {message}")]
    Segmentation { path: PathBuf, message: String },

    /// Attribution map could not be produced or parsed
    #[error("Attribution failed for {path}: {message}")]
    Attribution { path: PathBuf, message: String },

    /// Classifier model could not be loaded
    #[error("Model error for {path}: {message}")]
    Model { path: PathBuf, message: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Convenience type alias for CSE results.
pub type Result<T> = std::result::Result<T, CseError>;

/// Convenience type alias for search-core results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_error_reports_candidate_count() {
        let err = SearchError::Inference {
            message: "expected 10 classes, got 9".into(),
            candidates: vec![SubsetKey::new(vec![3]), SubsetKey::new(vec![1, 3])],
        };
        let text = err.to_string();
        assert!(text.contains("2 candidate(s)"));
        assert!(text.contains("expected 10 classes"));
    }

    #[test]
    fn test_search_error_converts_to_top_level() {
        let err: CseError = SearchError::invalid("start_n must be >= 1").into();
        assert!(matches!(err, CseError::Search(SearchError::InvalidInput(_))));
    }
}
