//! Explaining discovered images one by one with progress and streaming output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cse_core::{CancellationToken, Explanation, ReportWriter, SearchOutcome};

use super::{ExplainArgs, ExplainContext};

/// Tally of per-image results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Summary {
    hits: u64,
    exhausted: u64,
    skipped: u64,
    failed: u64,
}

impl Summary {
    fn record(&mut self, outcome: &SearchOutcome) {
        if outcome.is_hit() {
            self.hits += 1;
        } else {
            self.exhausted += 1;
        }
    }

    fn total(&self) -> u64 {
        self.hits + self.exhausted + self.skipped + self.failed
    }
}

/// Explain every file, writing each report as soon as its search ends.
///
/// Searches run on the blocking pool. After a cancellation request the
/// in-flight search stops at its next batch boundary, its report is written,
/// and the remaining files are left alone.
pub async fn explain_all(
    ctx: ExplainContext,
    args: &ExplainArgs,
    files: Vec<PathBuf>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = ReportWriter::new(sink, ctx.output_format, ctx.pretty);

    let progress = create_progress_bar(files.len() as u64, files.len() > 1);
    let mut summary = Summary::default();
    let start_time = Instant::now();

    for path in &files {
        if cancel.is_cancelled() {
            tracing::warn!("Cancelled; {} image(s) not explained", files.len() as u64 - summary.total());
            break;
        }

        let explainer = Arc::clone(&ctx.explainer);
        let file = path.clone();
        let token = cancel.clone();
        let target_class = args.class;
        let result =
            explain_blocking(move || explainer.explain(&file, target_class, &token)).await;

        match result {
            Ok(explanation) => {
                if let Some(report) = explanation.report() {
                    summary.record(&report.outcome);
                    writer.write(report)?;
                    if let Some(dir) = &args.save_masks {
                        save_region_mask(&explanation, dir, path)?;
                    }
                } else {
                    summary.skipped += 1;
                }
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!("Failed: {:?} - {}", path, e);
            }
        }

        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            progress.set_message(format!("{:.1} img/sec", summary.total() as f64 / elapsed));
        }
    }

    writer.finish()?;
    progress.finish_and_clear();

    if let Some(output_path) = &args.output {
        tracing::info!("Output written to {:?}", output_path);
    }
    if files.len() > 1 {
        print_summary(&summary, start_time.elapsed());
    }
    Ok(())
}

/// Run one search on the blocking pool. A panicking task is reported as an
/// error for that file; the remaining files still run.
async fn explain_blocking<F, T>(task: F) -> anyhow::Result<T>
where
    F: FnOnce() -> cse_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => Ok(result?),
        Err(e) => Err(anyhow::anyhow!("explain task failed: {e}")),
    }
}

/// Write the winning (or best) region of one image as a PNG.
fn save_region_mask(explanation: &Explanation, dir: &Path, image_path: &Path) -> anyhow::Result<()> {
    let Some(mask) = explanation.region_mask() else {
        return Ok(());
    };
    let target = mask_path(dir, image_path);
    mask.save(&target)?;
    tracing::debug!("Region mask written to {:?}", target);
    Ok(())
}

fn mask_path(dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    dir.join(format!("{stem}_region.png"))
}

fn create_progress_bar(total: u64, visible: bool) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

fn print_summary(summary: &Summary, elapsed: Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Hit:          {:>8}", summary.hits);
    eprintln!("    Exhausted:    {:>8}", summary.exhausted);
    if summary.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", summary.skipped);
    }
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total());
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}
