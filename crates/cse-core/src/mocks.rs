//! Deterministic in-memory classifiers for tests and benchmarks.
//!
//! None of these load a model. Each one derives a two-class output
//! `[1 - s, s]` from the pixels of the input, so search behaviour can be
//! scripted exactly.
//!
//! Compiled for this crate's own tests, or elsewhere with the `mocks` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ndarray::{Array2, Array4, Axis};

use crate::classifier::Classifier;
use crate::error::ClassifierError;

fn two_class_output(scores: impl Iterator<Item = f32>) -> Array2<f32> {
    let rows: Vec<f32> = scores.flat_map(|s| [1.0 - s, s]).collect();
    let n = rows.len() / 2;
    Array2::from_shape_vec((n, 2), rows).unwrap_or_else(|_| Array2::zeros((n, 2)))
}

/// Scores class 1 as `sum(pixels) / full`, clamped to `[0, 1]`.
#[derive(Debug)]
pub struct PixelSumClassifier {
    full: f32,
    declared_classes: usize,
    calls: AtomicUsize,
}

impl PixelSumClassifier {
    /// `full` is the pixel sum that maps to a class-1 score of 1.0.
    pub fn new(full: f32) -> Self {
        Self {
            full,
            declared_classes: 2,
            calls: AtomicUsize::new(0),
        }
    }

    /// Report a different class count than the two columns actually emitted.
    pub fn with_declared_classes(mut self, classes: usize) -> Self {
        self.declared_classes = classes;
        self
    }

    /// Number of forward passes so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for PixelSumClassifier {
    fn num_classes(&self) -> usize {
        self.declared_classes
    }

    fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(two_class_output(
            batch
                .axis_iter(Axis(0))
                .map(|item| (item.sum() / self.full).clamp(0.0, 1.0)),
        ))
    }
}

/// Scores class 1 by looking up how many pixels of channel 0 are non-zero.
///
/// With one pixel per segment, an all-ones image, keep-only masking and a
/// zero background, the count equals the subset size, so `table[n]` is the
/// score of every size-`n` subset. Counts past the table reuse its last entry.
#[derive(Debug)]
pub struct TableClassifier {
    table: Vec<f32>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl TableClassifier {
    pub fn new(table: Vec<f32>) -> Self {
        Self {
            table,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Size of every batch received, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default()
    }

    /// Number of forward passes so far.
    pub fn calls(&self) -> usize {
        self.batch_sizes().len()
    }

    fn lookup(&self, count: usize) -> f32 {
        self.table
            .get(count)
            .or_else(|| self.table.last())
            .copied()
            .unwrap_or(0.0)
    }
}

impl Classifier for TableClassifier {
    fn num_classes(&self) -> usize {
        2
    }

    fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError> {
        self.batch_sizes
            .lock()
            .map_err(|e| ClassifierError::Session(e.to_string()))?
            .push(batch.shape()[0]);

        Ok(two_class_output(batch.axis_iter(Axis(0)).map(|item| {
            let count = item
                .index_axis(Axis(0), 0)
                .iter()
                .filter(|v| **v != 0.0)
                .count();
            self.lookup(count)
        })))
    }
}

/// Always fails its forward pass.
#[derive(Debug, Default)]
pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn num_classes(&self) -> usize {
        2
    }

    fn forward(&self, _batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError> {
        Err(ClassifierError::Runtime("device lost".into()))
    }
}
