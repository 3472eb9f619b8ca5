//! The `cse config` command for configuration management.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use cse_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Show config file path
    Path,

    /// Write a config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Parse and range-check a config file
    Validate {
        /// File to check (defaults to the active config file)
        file: Option<PathBuf>,
    },
}

/// Execute the config command. `override_path` is the global `--config`.
pub async fn execute(args: ConfigArgs, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    match args.command {
        ConfigCommand::Show => {
            let config = super::load_config(override_path)?;
            println!("{}", config.to_toml()?);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            init_config(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Validate { file } => {
            let target = file.unwrap_or(path);
            if !target.exists() {
                anyhow::bail!(
                    "No config file at {}\n  Run `cse config init` to create one.",
                    target.display()
                );
            }
            Config::load_from(&target)?;
            println!("{} is valid", target.display());
        }
    }

    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}
