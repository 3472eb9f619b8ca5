//! Configuration validation with range checks.

use crate::error::{ConfigError, SearchError};
use crate::masking::Background;
use crate::search::SearchParams;

use super::Config;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        SearchParams::from_config(&self.search).map_err(|e| match e {
            SearchError::InvalidInput(message) => invalid(format!("search: {message}")),
            other => invalid(other.to_string()),
        })?;

        if let Background::Constant(v) = self.masking.background {
            if !v.is_finite() {
                return Err(invalid("masking.background constant must be finite"));
            }
        }

        let model = &self.model;
        if model.image_size == 0 {
            return Err(invalid("model.image_size must be > 0"));
        }
        if model.channels != 1 && model.channels != 3 {
            return Err(invalid("model.channels must be 1 or 3"));
        }
        if model.mean.len() != model.channels as usize || model.std.len() != model.channels as usize
        {
            return Err(invalid(
                "model.mean and model.std must have one entry per channel",
            ));
        }
        if model.std.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(invalid("model.std entries must be > 0"));
        }
        if model.num_classes == 0 {
            return Err(invalid("model.num_classes must be > 0"));
        }
        if let Some(class) = self.search.target_class {
            if class >= model.num_classes {
                return Err(invalid(format!(
                    "search.target_class {class} must be < model.num_classes ({})",
                    model.num_classes
                )));
            }
        }

        if self.segmentation.grid_cells == 0 {
            return Err(invalid("segmentation.grid_cells must be > 0"));
        }
        Ok(())
    }
}
