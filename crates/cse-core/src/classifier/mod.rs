//! Classifier collaborators.
//!
//! The search core only needs a synchronous, batch-shaped callable: a
//! `[batch, C, H, W]` tensor in, one row of class scores per item out.
//! Device selection and runtime details stay behind this trait.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cse_core::classifier::{Classifier, OnnxClassifier};
//! use cse_core::config::Config;
//!
//! let config = Config::load()?;
//! let model = OnnxClassifier::load(&config.model, &config.model_path())?;
//! let logits = model.forward(&batch)?; // [batch, num_classes]
//! ```

pub(crate) mod onnx;
pub(crate) mod preprocess;

use ndarray::{Array2, Array4};

use crate::error::ClassifierError;

pub use self::onnx::OnnxClassifier;
pub use self::preprocess::{preprocess, InputSpec};

/// A trained image classifier in evaluation mode.
///
/// Implementations must be deterministic for identical input. The model is
/// shared read-only across a search, hence `Send + Sync`.
pub trait Classifier: Send + Sync {
    /// Number of classes in each output row.
    fn num_classes(&self) -> usize;

    /// Run one forward pass over a `[batch, C, H, W]` tensor.
    ///
    /// Returns raw outputs of shape `[batch, num_classes]`.
    fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }

    fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError> {
        (**self).forward(batch)
    }
}
