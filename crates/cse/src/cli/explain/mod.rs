//! The `cse explain` command.

mod batch;
mod setup;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use cse_core::discovery::ImageDiscovery;
use cse_core::{CancellationToken, Config, Explainer, OutputFormat as CoreOutputFormat};

pub use types::{Attribution, OutputFormat, Policy, Prune, Segmenter};

use batch::explain_all;
use setup::setup_explainer;

/// Arguments for the `explain` command.
///
/// Every search option falls back to the config file when omitted.
#[derive(Args, Debug, Default)]
pub struct ExplainArgs {
    /// Image file or directory to explain
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Target class (defaults to the model's prediction for each image)
    #[arg(short, long)]
    pub class: Option<usize>,

    /// Target-class score a region set must reach, in (0, 1]
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Smallest number of segments to try
    #[arg(long)]
    pub start_n: Option<usize>,

    /// Largest number of segments to try
    #[arg(long)]
    pub stop_n: Option<usize>,

    /// Maximum subsets per classifier call
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Pruning heuristic
    #[arg(long, value_enum)]
    pub prune: Option<Prune>,

    /// Masking policy
    #[arg(long, value_enum)]
    pub policy: Option<Policy>,

    /// Cap on classifier evaluations per image
    #[arg(long)]
    pub budget: Option<usize>,

    /// Wall-clock cap per image in milliseconds
    #[arg(long)]
    pub time_budget_ms: Option<u64>,

    /// ONNX classifier model
    #[arg(short, long, env = "CSE_MODEL")]
    pub model: Option<PathBuf>,

    /// Segmentation provider
    #[arg(long, value_enum)]
    pub segmenter: Option<Segmenter>,

    /// Directory of label maps
    #[arg(long)]
    pub segments_dir: Option<String>,

    /// Attribution provider
    #[arg(long, value_enum)]
    pub attribution: Option<Attribution>,

    /// Directory of attribution maps
    #[arg(long)]
    pub attribution_dir: Option<String>,

    /// Write each winning region as `<dir>/<stem>_region.png`
    #[arg(long)]
    pub save_masks: Option<PathBuf>,

    /// Leave the per-subset evaluation trace out of reports
    #[arg(long)]
    pub no_trace: bool,
}

/// Everything assembled by `setup_explainer()`.
pub(crate) struct ExplainContext {
    pub explainer: Arc<Explainer>,
    pub output_format: CoreOutputFormat,
    pub pretty: bool,
}

/// Execute the explain command.
pub async fn execute(args: ExplainArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_explainer(&args, config)?;

    let files = ImageDiscovery::default().discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to explain", files.len());

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupted; finishing the current batch");
                signal_token.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    explain_all(ctx, &args, files, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ExplainArgs,
    }

    #[test]
    fn explain_args_parse_overrides() {
        let harness = Harness::parse_from([
            "cse",
            "digits/",
            "--class",
            "7",
            "--threshold",
            "0.8",
            "--prune",
            "none",
            "--policy",
            "occlude",
            "--format",
            "jsonl",
        ]);
        let args = harness.args;
        assert_eq!(args.input, PathBuf::from("digits/"));
        assert_eq!(args.class, Some(7));
        assert_eq!(args.threshold, Some(0.8));
        assert_eq!(args.prune, Some(Prune::None));
        assert_eq!(args.policy, Some(Policy::Occlude));
        assert_eq!(args.format, Some(OutputFormat::Jsonl));
    }

    #[test]
    fn explain_args_default_leaves_config_in_charge() {
        let args = ExplainArgs::default();
        assert!(args.threshold.is_none());
        assert!(args.format.is_none());
        assert!(!args.no_trace);
    }
}
