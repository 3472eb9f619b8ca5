//! ONNX Runtime classifier.
//!
//! Loads an image classifier exported to ONNX and runs batched forward
//! passes. The exported model is expected to take one NCHW float input and
//! produce a `[batch, num_classes]` output (logits or probabilities).

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array4};
use ort::session::Session;
use ort::value::Value;

use crate::config::ModelConfig;
use crate::error::{ClassifierError, InputError};

use super::Classifier;

/// Wraps an ONNX Runtime session for classification.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    /// Name of the input tensor (configured or detected from model metadata).
    input_name: String,
    /// Output to read; the first output when unset.
    output_name: Option<String>,
    num_classes: usize,
}

impl OnnxClassifier {
    /// Load a classifier from an ONNX file.
    pub fn load(config: &ModelConfig, model_path: &Path) -> Result<Self, InputError> {
        if !model_path.exists() {
            return Err(InputError::FileNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| InputError::Model {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| InputError::Model {
                path: model_path.to_path_buf(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input_name = config.input_name.clone().unwrap_or_else(|| {
            session
                .inputs()
                .first()
                .map(|i| i.name().to_string())
                .unwrap_or_else(|| "input".to_string())
        });

        tracing::debug!(
            "Loaded classifier from {:?} (input: {:?}, outputs: {:?}, classes: {})",
            model_path,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>(),
            config.num_classes
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name: config.output_name.clone(),
            num_classes: config.num_classes,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError> {
        let batch_size = batch.shape()[0];
        if batch_size == 0 {
            return Ok(Array2::zeros((0, self.num_classes)));
        }

        // Convert ndarray to (shape, flat_data) for ort.
        let shape: Vec<i64> = batch.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = batch.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| ClassifierError::Session(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| ClassifierError::Session(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| ClassifierError::Runtime(format!("ONNX inference failed: {e}")))?;

        let selected = match &self.output_name {
            Some(wanted) => outputs.iter().find(|(name, _)| *name == wanted.as_str()),
            None => outputs.iter().next(),
        }
        .ok_or_else(|| {
            ClassifierError::Runtime(format!(
                "Model did not produce output {:?}",
                self.output_name.as_deref().unwrap_or("<first>")
            ))
        })?;

        let (out_shape, data) = selected.1.try_extract_tensor::<f32>().map_err(|e| {
            ClassifierError::Runtime(format!("Failed to extract output tensor: {e}"))
        })?;

        // Accept [N, classes] or a flat [N * classes] output.
        let columns = match out_shape.len() {
            1 => data.len() / batch_size,
            2 => out_shape[1] as usize,
            _ => {
                return Err(ClassifierError::Runtime(format!(
                    "Unexpected output shape: {:?}",
                    out_shape
                )));
            }
        };

        Array2::from_shape_vec((data.len() / columns.max(1), columns), data.to_vec())
            .map_err(|e| ClassifierError::Runtime(format!("Malformed output tensor: {e}")))
    }
}
