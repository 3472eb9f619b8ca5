//! CSE CLI - counterfactual region search for image classifiers.
//!
//! For each image, CSE ranks its segments by attribution, then grows a set of
//! the top-ranked segments until the classifier's target-class score reaches
//! a threshold. The result is the smallest such region set, or the best one
//! seen if none reaches it.
//!
//! # Usage
//!
//! ```bash
//! # Explain one image as class 7
//! cse explain seven.png --class 7
//!
//! # Explain a directory, streaming JSONL and saving region masks
//! cse explain ./digits/ --format jsonl --output results.jsonl --save-masks ./masks
//!
//! # View configuration
//! cse config show
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// CSE - find the smallest image regions that carry a classifier's decision.
#[derive(Parser, Debug)]
#[command(name = "cse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "CSE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for the smallest explaining region set of each image
    Explain(cli::explain::ExplainArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `config` subcommands must still run against a broken or missing file.
    let strict = matches!(cli.command, Commands::Explain(_));
    let config = cli::startup_config(cli.config.as_deref(), strict)?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("CSE v{}", cse_core::VERSION);

    match cli.command {
        Commands::Explain(args) => cli::explain::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
