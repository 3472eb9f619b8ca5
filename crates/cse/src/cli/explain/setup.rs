//! Explainer setup: CLI overrides on top of the config, then model loading.

use std::sync::Arc;

use cse_core::{Config, Explainer};

use super::{ExplainArgs, ExplainContext};

/// Validate the input, apply overrides, and load the classifier.
pub fn setup_explainer(args: &ExplainArgs, mut config: Config) -> anyhow::Result<ExplainContext> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    apply_overrides(&mut config, args);
    config.validate()?;

    if let Some(dir) = &args.save_masks {
        std::fs::create_dir_all(dir)?;
    }

    let model_path = config.model_path();
    if !model_path.exists() {
        anyhow::bail!(
            "Classifier model not found at {:?}\n\n  Hint: pass --model or set [model].path in the config.",
            model_path
        );
    }
    let explainer = Explainer::from_config(config)?;
    tracing::info!("Classifier loaded from {:?}", model_path);

    let output_format = args
        .format
        .map(Into::into)
        .unwrap_or(explainer.config().output.format);
    let pretty = args.pretty || explainer.config().output.pretty;

    Ok(ExplainContext {
        explainer: Arc::new(explainer),
        output_format,
        pretty,
    })
}

/// Copy every option given on the command line into the config.
pub fn apply_overrides(config: &mut Config, args: &ExplainArgs) {
    let search = &mut config.search;
    if let Some(class) = args.class {
        search.target_class = Some(class);
    }
    if let Some(threshold) = args.threshold {
        search.threshold = threshold;
    }
    if let Some(start_n) = args.start_n {
        search.start_n = start_n;
    }
    if let Some(stop_n) = args.stop_n {
        search.stop_n = stop_n;
    }
    if let Some(batch_size) = args.batch_size {
        search.max_batch_size = batch_size;
    }
    if let Some(prune) = args.prune {
        search.prune_heuristic = prune.into();
    }
    if let Some(budget) = args.budget {
        search.evaluation_budget = Some(budget);
    }
    if let Some(ms) = args.time_budget_ms {
        search.time_budget_ms = Some(ms);
    }

    if let Some(policy) = args.policy {
        config.masking.policy = policy.into();
    }
    if let Some(model) = &args.model {
        config.model.path = model.clone();
    }
    if let Some(segmenter) = args.segmenter {
        config.segmentation.method = segmenter.into();
    }
    if let Some(dir) = &args.segments_dir {
        config.segmentation.dir = dir.clone();
    }
    if let Some(attribution) = args.attribution {
        config.attribution.method = attribution.into();
    }
    if let Some(dir) = &args.attribution_dir {
        config.attribution.dir = dir.clone();
    }
    if args.no_trace {
        config.output.include_trace = false;
    }
}
