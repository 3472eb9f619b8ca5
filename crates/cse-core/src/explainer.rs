//! End-to-end explanation of one image file.
//!
//! Wires the stages together: hash and decode the file, preprocess it for
//! the classifier, fetch its label map and attribution map, reduce the
//! attribution to segment scores, check the unmasked prediction, and run the
//! search.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::GrayImage;
use serde::Serialize;

use crate::classifier::{preprocess, Classifier, InputSpec, OnnxClassifier};
use crate::config::Config;
use crate::discovery::content_hash;
use crate::error::{InputError, Result};
use crate::masking::render_region_mask;
use crate::providers::{
    attribution_provider, segmentation_provider, AttributionProvider, SegmentationProvider,
};
use crate::ranking::aggregate;
use crate::search::{CancellationToken, SearchController, SearchParams, SearchRequest};
use crate::segments::SegmentMap;
use crate::types::SearchReport;

/// Why an image was not searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The unmasked image is not classified as the target class, so there
    /// is no prediction to explain.
    PredictionMismatch { predicted: usize, target: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PredictionMismatch { predicted, target } => {
                write!(f, "predicted class {predicted}, target class {target}")
            }
        }
    }
}

/// Result of explaining one file.
#[derive(Debug)]
pub enum Explanation {
    /// The search ran (hit or exhausted).
    Report {
        report: Box<SearchReport>,
        /// Label map the search used, for rendering region masks
        segments: SegmentMap,
    },
    /// The search was not attempted.
    Skipped { path: PathBuf, reason: SkipReason },
}

impl Explanation {
    pub fn report(&self) -> Option<&SearchReport> {
        match self {
            Explanation::Report { report, .. } => Some(report),
            Explanation::Skipped { .. } => None,
        }
    }

    /// Binary mask of the winning (or best) subset at tensor resolution.
    pub fn region_mask(&self) -> Option<GrayImage> {
        match self {
            Explanation::Report { report, segments } => report
                .outcome
                .result()
                .map(|result| render_region_mask(segments, &result.subset)),
            Explanation::Skipped { .. } => None,
        }
    }
}

/// Explains images with one classifier, one provider pair and fixed search
/// settings.
pub struct Explainer {
    config: Config,
    classifier: Box<dyn Classifier>,
    segmenter: Box<dyn SegmentationProvider>,
    attributor: Box<dyn AttributionProvider>,
    controller: SearchController,
    input: InputSpec,
}

impl Explainer {
    /// Build an explainer around an already-loaded classifier. Providers are
    /// chosen from the config.
    pub fn new(config: Config, classifier: Box<dyn Classifier>) -> Result<Self> {
        config.validate()?;
        let params = SearchParams::from_config(&config.search)?;
        let controller =
            SearchController::new(params, config.masking.clone(), config.model.activation)?;

        Ok(Self {
            segmenter: segmentation_provider(&config),
            attributor: attribution_provider(&config),
            input: InputSpec::from(&config.model),
            classifier,
            controller,
            config,
        })
    }

    /// Load the ONNX model named in the config and build an explainer.
    pub fn from_config(config: Config) -> Result<Self> {
        let model_path = config.model_path();
        let classifier = OnnxClassifier::load(&config.model, &model_path)?;
        Self::new(config, Box::new(classifier))
    }

    pub fn with_segmentation(mut self, provider: Box<dyn SegmentationProvider>) -> Self {
        self.segmenter = provider;
        self
    }

    pub fn with_attribution(mut self, provider: Box<dyn AttributionProvider>) -> Self {
        self.attributor = provider;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Explain one image.
    ///
    /// `target_class` falls back to the config, then to the class the model
    /// predicts for the unmasked image.
    pub fn explain(
        &self,
        path: &Path,
        target_class: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Explanation> {
        let start = Instant::now();
        tracing::debug!("Explaining: {:?}", path);

        if !path.exists() {
            return Err(InputError::FileNotFound(path.to_path_buf()).into());
        }
        let content_hash = content_hash(path)?;
        let image = image::open(path).map_err(|e| InputError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let tensor = preprocess(&image, &self.input);
        let (_, h, w) = tensor.dim();

        let segments = self.segmenter.segment(path, (h, w))?;
        let attribution = self.attributor.attribute(path, (h, w))?;
        let scores = aggregate(&segments, &attribution, self.config.attribution.aggregation)?;
        tracing::trace!(
            "  {} segments via {}, attribution via {}",
            segments.segment_count(),
            self.segmenter.name(),
            self.attributor.name()
        );

        let evaluator = self.controller.evaluator();
        let classifier = self.classifier.as_ref();
        let unmasked = match target_class.or(self.config.search.target_class) {
            Some(class) => evaluator.classify(classifier, &tensor, class)?,
            None => evaluator.classify_top(classifier, &tensor)?,
        };
        let target_class = target_class
            .or(self.config.search.target_class)
            .unwrap_or(unmasked.predicted_class);

        if self.config.model.require_prediction_match && unmasked.predicted_class != target_class
        {
            let reason = SkipReason::PredictionMismatch {
                predicted: unmasked.predicted_class,
                target: target_class,
            };
            tracing::warn!("Skipping {:?}: {}", path, reason);
            return Ok(Explanation::Skipped {
                path: path.to_path_buf(),
                reason,
            });
        }

        let request = SearchRequest {
            image: &tensor,
            segments: &segments,
            scores: &scores,
            target_class,
        };
        let run = self.controller.run(classifier, &request, cancel)?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!("Explained {:?} in {:?}", file_name, start.elapsed());

        let report = SearchReport {
            file_path: path.to_path_buf(),
            file_name,
            content_hash,
            target_class,
            unmasked_score: unmasked.score,
            unmasked_prediction: unmasked.predicted_class,
            segment_count: segments.segment_count(),
            mask_policy: self.config.masking.policy,
            threshold: self.controller.params().threshold,
            outcome: run.outcome,
            trace: if self.config.output.include_trace {
                run.trace
            } else {
                Vec::new()
            },
            stats: run.stats,
        };

        Ok(Explanation::Report {
            report: Box::new(report),
            segments,
        })
    }
}
