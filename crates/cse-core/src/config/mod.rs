//! Configuration management for CSE.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every field. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search controller settings
    pub search: SearchConfig,

    /// Masked-image settings
    pub masking: MaskingConfig,

    /// Classifier model settings
    pub model: ModelConfig,

    /// Segmentation provider settings
    pub segmentation: SegmentationConfig,

    /// Attribution provider settings
    pub attribution: AttributionConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.cse.cse/config.toml
    /// - Linux: ~/.config/cse/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\cse\config\config.toml
    ///
    /// Falls back to ~/.cse/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "cse", "cse")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".cse").join("config.toml")
            })
    }

    /// Resolved classifier model path (with ~ expansion).
    pub fn model_path(&self) -> PathBuf {
        expand(&self.model.path.to_string_lossy())
    }

    /// Resolved label-map directory (with ~ expansion).
    pub fn segmentation_dir(&self) -> PathBuf {
        expand(&self.segmentation.dir)
    }

    /// Resolved attribution-map directory (with ~ expansion).
    pub fn attribution_dir(&self) -> PathBuf {
        expand(&self.attribution.dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
