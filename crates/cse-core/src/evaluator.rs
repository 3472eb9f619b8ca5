//! Batched classifier evaluation of candidate subsets.
//!
//! Masked tensors are grouped into contiguous chunks of at most
//! `max_batch_size`, each chunk goes through one forward pass, and every row
//! of the output is decoded into a (target score, predicted class) pair.
//! Chunking only affects throughput; results are identical for any batch size.

use ndarray::{stack, Array1, Array2, Array3, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::error::{SearchError, SearchResult};
use crate::types::{CandidateSubset, EvaluationResult, SubsetKey};

/// Activation applied to raw classifier outputs before thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreActivation {
    /// Softmax over classes (model outputs logits)
    #[default]
    Softmax,
    /// Independent sigmoid per class (multi-label logits)
    Sigmoid,
    /// Outputs are already probabilities
    Identity,
}

impl ScoreActivation {
    /// Apply the activation to one output row.
    pub fn apply(self, row: ArrayView1<f32>) -> Array1<f32> {
        match self {
            ScoreActivation::Identity => row.to_owned(),
            ScoreActivation::Sigmoid => row.mapv(|x| 1.0 / (1.0 + (-x).exp())),
            ScoreActivation::Softmax => {
                let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let exp = row.mapv(|x| (x - max).exp());
                let sum = exp.sum();
                exp / sum
            }
        }
    }
}

/// Decoded output for one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Target-class score after activation
    pub score: f32,
    /// Arg-max class (lowest index wins ties)
    pub predicted_class: usize,
}

/// Runs candidate tensors through a classifier in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct BatchEvaluator {
    max_batch_size: usize,
    activation: ScoreActivation,
}

impl BatchEvaluator {
    pub fn new(max_batch_size: usize, activation: ScoreActivation) -> SearchResult<Self> {
        if max_batch_size == 0 {
            return Err(SearchError::invalid("max_batch_size must be >= 1"));
        }
        Ok(Self {
            max_batch_size,
            activation,
        })
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Evaluate `tensors[i]` as the masked image of `subsets[i]`.
    ///
    /// Results are aligned 1:1 with the input. If any chunk fails, nothing is
    /// returned and the error lists every candidate of the failing chunk.
    pub fn evaluate(
        &self,
        model: &dyn Classifier,
        subsets: &[CandidateSubset],
        tensors: &[Array3<f32>],
        target_class: usize,
    ) -> SearchResult<Vec<EvaluationResult>> {
        if subsets.len() != tensors.len() {
            return Err(SearchError::invalid(format!(
                "{} subsets but {} tensors",
                subsets.len(),
                tensors.len()
            )));
        }
        check_target_class(model, target_class)?;

        let mut results = Vec::with_capacity(subsets.len());
        for (chunk_subsets, chunk_tensors) in subsets
            .chunks(self.max_batch_size)
            .zip(tensors.chunks(self.max_batch_size))
        {
            let predictions = self
                .predict(model, chunk_tensors, Some(target_class))
                .map_err(|message| SearchError::Inference {
                    message,
                    candidates: chunk_subsets.iter().map(|s| s.key().clone()).collect(),
                })?;

            results.extend(
                chunk_subsets
                    .iter()
                    .zip(predictions)
                    .map(|(subset, p)| EvaluationResult {
                        subset: subset.clone(),
                        score: p.score,
                        predicted_class: p.predicted_class,
                    }),
            );
        }
        Ok(results)
    }

    /// Classify a single unmasked image.
    pub fn classify(
        &self,
        model: &dyn Classifier,
        tensor: &Array3<f32>,
        target_class: usize,
    ) -> SearchResult<Prediction> {
        check_target_class(model, target_class)?;
        self.predict_one(model, tensor, Some(target_class))
    }

    /// Classify a single unmasked image, scoring whichever class it predicts.
    pub fn classify_top(
        &self,
        model: &dyn Classifier,
        tensor: &Array3<f32>,
    ) -> SearchResult<Prediction> {
        self.predict_one(model, tensor, None)
    }

    fn predict_one(
        &self,
        model: &dyn Classifier,
        tensor: &Array3<f32>,
        target_class: Option<usize>,
    ) -> SearchResult<Prediction> {
        self.predict(model, std::slice::from_ref(tensor), target_class)
            .map_err(|message| SearchError::Inference {
                message,
                candidates: vec![SubsetKey::new(Vec::new())],
            })?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Inference {
                message: "classifier returned no rows".into(),
                candidates: Vec::new(),
            })
    }

    /// One forward pass over a chunk, decoded per row. Without a target
    /// class each row is scored on its own arg-max.
    fn predict(
        &self,
        model: &dyn Classifier,
        tensors: &[Array3<f32>],
        target_class: Option<usize>,
    ) -> Result<Vec<Prediction>, String> {
        let views: Vec<_> = tensors.iter().map(|t| t.view()).collect();
        let batch = stack(Axis(0), &views).map_err(|e| format!("cannot stack batch: {e}"))?;

        let output = model.forward(&batch).map_err(|e| e.to_string())?;
        check_output_shape(&output, tensors.len(), model.num_classes())?;

        output
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, row)| {
                let activated = self.activation.apply(row);
                let predicted_class = argmax(activated.view());
                let score = activated[target_class.unwrap_or(predicted_class)];
                if !score.is_finite() {
                    return Err(format!("row {i}: non-finite score {score}"));
                }
                Ok(Prediction {
                    score,
                    predicted_class,
                })
            })
            .collect()
    }
}

fn check_target_class(model: &dyn Classifier, target_class: usize) -> SearchResult<()> {
    if target_class >= model.num_classes() {
        return Err(SearchError::invalid(format!(
            "target class {target_class} is out of range for a {}-class model",
            model.num_classes()
        )));
    }
    Ok(())
}

fn check_output_shape(output: &Array2<f32>, rows: usize, classes: usize) -> Result<(), String> {
    if output.dim() != (rows, classes) {
        return Err(format!(
            "classifier output shape {:?}, expected ({rows}, {classes})",
            output.dim()
        ));
    }
    Ok(())
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}
