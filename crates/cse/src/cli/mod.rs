//! Command implementations.

pub mod config;
pub mod explain;

use std::path::Path;

use anyhow::Context;
use cse_core::Config;

/// Load `path` if given, otherwise the default config location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::load()?),
    }
}

/// Config for a command about to run.
///
/// A file named with `--config` must load when `strict` is set. Otherwise a
/// broken file is reported on stderr and the defaults are used.
pub fn startup_config(path: Option<&Path>, strict: bool) -> anyhow::Result<Config> {
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(e) if strict && path.is_some() => Err(e),
        Err(e) => {
            // Logging is not up yet, so this goes to stderr directly.
            eprintln!(
                "Warning: Failed to load config: {e:#}\n  \
                 Using default configuration. Check your config file with `cse config validate`."
            );
            Ok(Config::default())
        }
    }
}
