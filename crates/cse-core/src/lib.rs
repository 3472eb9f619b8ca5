//! CSE Core - counterfactual region search for image classifier explanations.
//!
//! Given an image, a segmentation of it into regions, and per-region
//! attribution scores, CSE finds the smallest set of top-ranked regions that
//! on its own (or, under the occlude policy, by its absence) drives the
//! classifier's target-class score to a threshold.
//!
//! # Architecture
//!
//! ```text
//! attribution scores ─► rank ─► prefix subsets ─► masked images ─► classifier (batched)
//!                                     ▲                                  │
//!                                     └──── search controller ◄──────────┘
//! ```
//!
//! The search core ([`search`], [`subsets`], [`masking`], [`evaluator`]) is
//! synchronous and I/O free. File handling, providers and the ONNX model
//! live around it ([`explainer`], [`providers`], [`classifier`]).
//!
//! # Usage
//!
//! ```rust,ignore
//! use cse_core::{CancellationToken, Config, Explainer};
//!
//! let explainer = Explainer::from_config(Config::load()?)?;
//! let explanation = explainer.explain("./seven.png".as_ref(), Some(7), &CancellationToken::new())?;
//! if let Some(report) = explanation.report() {
//!     println!("{:?}", report.outcome);
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod discovery;
pub mod error;
pub mod evaluator;
pub mod explainer;
pub mod masking;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod output;
pub mod providers;
pub mod ranking;
pub mod search;
pub mod segments;
pub mod subsets;
pub mod types;

pub use classifier::{Classifier, OnnxClassifier};
pub use config::Config;
pub use error::{ClassifierError, ConfigError, CseError, InputError, Result, SearchError};
pub use evaluator::{BatchEvaluator, ScoreActivation};
pub use explainer::{Explainer, Explanation, SkipReason};
pub use masking::{Background, MaskBuilder, MaskPolicy};
pub use output::{OutputFormat, ReportWriter};
pub use search::{CancellationToken, SearchBudget, SearchController, SearchParams, SearchRequest};
pub use segments::{ImageTensor, SegmentMap};
pub use subsets::{PrefixGenerator, PruneHeuristic};
pub use types::{
    CandidateSubset, EvaluationResult, ExhaustionReason, SearchOutcome, SearchReport, SearchRun,
    SearchStats, SegmentId, SubsetKey,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
