//! Search controller: drives generation, masking and evaluation in rounds.
//!
//! A search moves through four phases:
//!
//! ```text
//! Init ──► Evaluating ──► Hit
//!                    └──► Exhausted
//! ```
//!
//! `Init` validates the request and ranks the segments. `Evaluating` pulls
//! one batch of prefixes at a time, masks and classifies it, and commits the
//! results; between batches it checks cancellation and both budgets. The
//! first subset (by size, then id tuple) whose target score reaches the
//! threshold wins. If the range or a budget runs out first, the search ends
//! `Exhausted` and reports the best subset it saw.
//!
//! Batches are strictly sequential: whether the next batch runs at all
//! depends on the results of the previous one.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::classifier::Classifier;
use crate::config::{MaskingConfig, SearchConfig};
use crate::error::{SearchError, SearchResult};
use crate::evaluator::{BatchEvaluator, ScoreActivation};
use crate::masking::MaskBuilder;
use crate::ranking::{rank_for_map, AttributionScores};
use crate::segments::{ImageTensor, SegmentMap};
use crate::subsets::{PrefixGenerator, PruneHeuristic};
use crate::types::{
    CandidateSubset, EvaluationResult, ExhaustionReason, SearchOutcome, SearchRun, SearchStats,
    SegmentId, SubsetKey,
};

/// Caps on the total work of one search, checked between batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    /// Maximum number of subsets sent to the classifier
    pub max_evaluations: Option<usize>,
    /// Maximum wall-clock time
    pub time_limit: Option<Duration>,
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub start_n: usize,
    pub stop_n: usize,
    pub threshold: f32,
    pub max_batch_size: usize,
    pub prune_heuristic: PruneHeuristic,
    pub budget: SearchBudget,
}

impl SearchParams {
    /// Parameters with no budget and early stopping.
    pub fn new(
        start_n: usize,
        stop_n: usize,
        threshold: f32,
        max_batch_size: usize,
    ) -> SearchResult<Self> {
        let params = Self {
            start_n,
            stop_n,
            threshold,
            max_batch_size,
            prune_heuristic: PruneHeuristic::EarlyStop,
            budget: SearchBudget::default(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        let params = Self {
            start_n: config.start_n,
            stop_n: config.stop_n,
            threshold: config.threshold,
            max_batch_size: config.max_batch_size,
            prune_heuristic: config.prune_heuristic,
            budget: SearchBudget {
                max_evaluations: config.evaluation_budget,
                time_limit: config.time_budget_ms.map(Duration::from_millis),
            },
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_prune_heuristic(mut self, heuristic: PruneHeuristic) -> Self {
        self.prune_heuristic = heuristic;
        self
    }

    pub fn with_budget(mut self, budget: SearchBudget) -> SearchResult<Self> {
        self.budget = budget;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> SearchResult<()> {
        if self.start_n == 0 {
            return Err(SearchError::invalid("start_n must be >= 1"));
        }
        if self.start_n > self.stop_n {
            return Err(SearchError::invalid(format!(
                "start_n ({}) must be <= stop_n ({})",
                self.start_n, self.stop_n
            )));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(SearchError::invalid(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.max_batch_size == 0 {
            return Err(SearchError::invalid("max_batch_size must be >= 1"));
        }
        if self.budget.max_evaluations == Some(0) {
            return Err(SearchError::invalid("evaluation_budget must be >= 1 when set"));
        }
        if self.budget.time_limit == Some(Duration::ZERO) {
            return Err(SearchError::invalid("time_budget_ms must be > 0 when set"));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag shared between a search and its caller.
///
/// Checked between batches; at most one in-flight batch completes after
/// `cancel()` is called.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Inputs of one search. Everything here is read-only to the search.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub image: &'a ImageTensor,
    pub segments: &'a SegmentMap,
    pub scores: &'a AttributionScores,
    pub target_class: usize,
}

/// Phase of a running search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Init,
    Evaluating,
    Hit,
    Exhausted,
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchPhase::Init => "init",
            SearchPhase::Evaluating => "evaluating",
            SearchPhase::Hit => "hit",
            SearchPhase::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Mutable state of one search. Created and dropped inside `run`.
struct SearchState {
    evaluated: HashSet<SubsetKey>,
    trace: Vec<EvaluationResult>,
    best: Option<EvaluationResult>,
    hit: Option<EvaluationResult>,
    remaining_budget: Option<usize>,
    stats: SearchStats,
}

impl SearchState {
    fn new(budget: &SearchBudget) -> Self {
        Self {
            evaluated: HashSet::new(),
            trace: Vec::new(),
            best: None,
            hit: None,
            remaining_budget: budget.max_evaluations,
            stats: SearchStats::default(),
        }
    }

    /// How many subsets the next batch may hold.
    fn batch_capacity(&self, max_batch_size: usize) -> usize {
        self.remaining_budget
            .map_or(max_batch_size, |left| left.min(max_batch_size))
    }

    /// Pull up to `capacity` subsets whose keys have not been evaluated.
    fn next_batch(
        &mut self,
        generator: &mut PrefixGenerator<'_>,
        capacity: usize,
    ) -> Vec<CandidateSubset> {
        let mut batch: Vec<CandidateSubset> = Vec::with_capacity(capacity);
        while batch.len() < capacity {
            let Some(subset) = generator.next() else {
                break;
            };
            let seen = self.evaluated.contains(subset.key())
                || batch.iter().any(|queued| queued.key() == subset.key());
            if seen {
                tracing::debug!("Skipping already-evaluated subset {:?}", subset.key().ids());
                self.stats.duplicates_skipped += 1;
            } else {
                batch.push(subset);
            }
        }
        batch
    }

    /// Record a fully evaluated batch. Returns the batch's winning hit, if any.
    fn commit(&mut self, results: Vec<EvaluationResult>, threshold: f32) -> Option<usize> {
        self.stats.batches += 1;
        self.stats.evaluations += results.len();
        if let Some(left) = self.remaining_budget.as_mut() {
            *left = left.saturating_sub(results.len());
        }

        let mut batch_hit: Option<&EvaluationResult> = None;
        for result in &results {
            if self
                .best
                .as_ref()
                .map_or(true, |best| result.score >= best.score)
            {
                self.best = Some(result.clone());
            }
            if result.score >= threshold
                && batch_hit.map_or(true, |hit| {
                    result.subset.selection_cmp(&hit.subset) == std::cmp::Ordering::Less
                })
            {
                batch_hit = Some(result);
            }
        }

        let hit_size = batch_hit.map(|hit| hit.subset.size());
        if let Some(hit) = batch_hit {
            let improves = self.hit.as_ref().map_or(true, |current| {
                hit.subset.selection_cmp(&current.subset) == std::cmp::Ordering::Less
            });
            if improves {
                self.hit = Some(hit.clone());
            }
        }

        for result in results {
            self.evaluated.insert(result.subset.key().clone());
            self.trace.push(result);
        }
        hit_size
    }

    fn finish(mut self, reason: ExhaustionReason, started: Instant) -> SearchRun {
        self.stats.elapsed_ms = started.elapsed().as_millis() as u64;
        let outcome = match self.hit {
            Some(winner) => SearchOutcome::Hit { winner },
            None => SearchOutcome::Exhausted {
                best: self.best,
                reason,
            },
        };
        let phase = if outcome.is_hit() {
            SearchPhase::Hit
        } else {
            SearchPhase::Exhausted
        };
        tracing::info!(
            "Search {} after {} evaluation(s) in {} batch(es), {}ms{}",
            phase,
            self.stats.evaluations,
            self.stats.batches,
            self.stats.elapsed_ms,
            match &outcome {
                SearchOutcome::Hit { winner } => format!(
                    " (size {}, score {:.4})",
                    winner.subset.size(),
                    winner.score
                ),
                SearchOutcome::Exhausted { reason, .. } => format!(" ({reason:?})"),
            }
        );
        SearchRun {
            outcome,
            trace: self.trace,
            stats: self.stats,
        }
    }
}

/// Runs counterfactual searches with fixed parameters and masking policy.
///
/// The controller itself holds no per-search state, so one instance can run
/// any number of searches one after another or from separate threads.
#[derive(Debug, Clone)]
pub struct SearchController {
    params: SearchParams,
    masking: MaskingConfig,
    evaluator: BatchEvaluator,
}

impl SearchController {
    pub fn new(
        params: SearchParams,
        masking: MaskingConfig,
        activation: ScoreActivation,
    ) -> SearchResult<Self> {
        params.validate()?;
        let evaluator = BatchEvaluator::new(params.max_batch_size, activation)?;
        Ok(Self {
            params,
            masking,
            evaluator,
        })
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn masking(&self) -> &MaskingConfig {
        &self.masking
    }

    pub fn evaluator(&self) -> &BatchEvaluator {
        &self.evaluator
    }

    /// Rank the request's attribution scores and search their prefixes.
    pub fn run(
        &self,
        model: &dyn Classifier,
        request: &SearchRequest<'_>,
        cancel: &CancellationToken,
    ) -> SearchResult<SearchRun> {
        tracing::debug!("Search phase: {}", SearchPhase::Init);
        let ranked = rank_for_map(request.scores, request.segments)?;
        self.run_ranked(model, request, &ranked, cancel)
    }

    /// Search prefixes of a caller-supplied ranking.
    ///
    /// Every id must exist in the segment map. Repeated ids are tolerated:
    /// prefixes whose key was already evaluated are skipped.
    pub fn run_ranked(
        &self,
        model: &dyn Classifier,
        request: &SearchRequest<'_>,
        ranked: &[SegmentId],
        cancel: &CancellationToken,
    ) -> SearchResult<SearchRun> {
        let started = Instant::now();

        // Init: everything that can fail before inference fails here.
        if ranked.is_empty() {
            return Err(SearchError::invalid("ranking is empty"));
        }
        if let Some(id) = ranked.iter().find(|id| !request.segments.contains(**id)) {
            return Err(SearchError::invalid(format!(
                "ranked segment {id} is not in the segment map"
            )));
        }
        if request.target_class >= model.num_classes() {
            return Err(SearchError::invalid(format!(
                "target class {} is out of range for a {}-class model",
                request.target_class,
                model.num_classes()
            )));
        }
        let builder = MaskBuilder::new(
            request.image,
            request.segments,
            self.masking.policy,
            self.masking.background,
        )?;

        let params = &self.params;
        let deadline = params.budget.time_limit.map(|limit| started + limit);
        let mut generator = PrefixGenerator::new(
            ranked,
            params.start_n,
            params.stop_n,
            params.prune_heuristic,
        );
        let mut state = SearchState::new(&params.budget);

        if generator.is_empty() {
            tracing::debug!(
                "No candidates: start_n {} exceeds {} ranked segment(s)",
                params.start_n,
                ranked.len()
            );
            return Ok(state.finish(ExhaustionReason::NoCandidates, started));
        }

        tracing::debug!(
            "Search phase: {} ({} ranked segments, sizes {}..={}, batch {})",
            SearchPhase::Evaluating,
            ranked.len(),
            params.start_n,
            params.stop_n.min(ranked.len()),
            params.max_batch_size
        );

        let reason = loop {
            if cancel.is_cancelled() {
                break ExhaustionReason::Cancelled;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break ExhaustionReason::DeadlineReached;
            }
            if generator.len() == 0 {
                break ExhaustionReason::GeneratorExhausted;
            }
            let capacity = state.batch_capacity(params.max_batch_size);
            if capacity == 0 {
                break ExhaustionReason::BudgetSpent;
            }

            let batch = state.next_batch(&mut generator, capacity);
            if batch.is_empty() {
                break ExhaustionReason::GeneratorExhausted;
            }

            let tensors = builder.build_batch(&batch, self.masking.parallel);
            let results =
                self.evaluator
                    .evaluate(model, &batch, &tensors, request.target_class)?;
            tracing::trace!(
                "Batch {}: sizes {}..={}, scores {:?}",
                state.stats.batches + 1,
                batch[0].size(),
                batch[batch.len() - 1].size(),
                results.iter().map(|r| r.score).collect::<Vec<_>>()
            );

            if let Some(size) = state.commit(results, params.threshold) {
                tracing::debug!("Threshold {} reached at size {}", params.threshold, size);
                if generator.report_hit(size) {
                    break ExhaustionReason::GeneratorExhausted;
                }
            }
        };

        Ok(state.finish(reason, started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaskingConfig;
    use crate::masking::{Background, MaskPolicy};
    use crate::error::ClassifierError;
    use crate::mocks::{FailingClassifier, TableClassifier};
    use ndarray::{Array2, Array4};

    /// Table scores, but every forward pass takes at least `delay`.
    struct SlowClassifier {
        inner: TableClassifier,
        delay: Duration,
    }

    impl Classifier for SlowClassifier {
        fn num_classes(&self) -> usize {
            self.inner.num_classes()
        }

        fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError> {
            std::thread::sleep(self.delay);
            self.inner.forward(batch)
        }
    }

    /// Table scores; requests cancellation from inside its forward pass.
    struct CancellingClassifier {
        inner: TableClassifier,
        cancel: CancellationToken,
    }

    impl Classifier for CancellingClassifier {
        fn num_classes(&self) -> usize {
            self.inner.num_classes()
        }

        fn forward(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifierError> {
            self.cancel.cancel();
            self.inner.forward(batch)
        }
    }

    /// One pixel per segment, all ones, ids 0..8 in a single row.
    fn fixture() -> (ImageTensor, SegmentMap, AttributionScores) {
        let image = ImageTensor::ones((1, 1, 8));
        let segments = SegmentMap::new(Array2::from_shape_fn((1, 8), |(_, x)| x as u32)).unwrap();
        // Ranks as [5, 2, 7, 1, ...]
        let mut scores: AttributionScores = (0..8).map(|id| (id, 0.0)).collect();
        scores.insert(5, 0.9);
        scores.insert(2, 0.8);
        scores.insert(7, 0.7);
        scores.insert(1, 0.6);
        (image, segments, scores)
    }

    fn keep_only_zero() -> MaskingConfig {
        MaskingConfig {
            policy: MaskPolicy::KeepOnly,
            background: Background::Zero,
            parallel: false,
        }
    }

    fn controller(params: SearchParams) -> SearchController {
        SearchController::new(params, keep_only_zero(), ScoreActivation::Identity).unwrap()
    }

    fn table() -> TableClassifier {
        TableClassifier::new(vec![0.0, 0.3, 0.3, 0.85, 0.85])
    }

    #[test]
    fn test_params_validation() {
        assert!(SearchParams::new(0, 4, 0.8, 1).is_err());
        assert!(SearchParams::new(5, 4, 0.8, 1).is_err());
        assert!(SearchParams::new(1, 4, 0.0, 1).is_err());
        assert!(SearchParams::new(1, 4, f32::NAN, 1).is_err());
        assert!(SearchParams::new(1, 4, 0.8, 0).is_err());
        assert!(SearchParams::new(1, 4, 1.0, 1).is_ok());
        let budget = SearchBudget {
            max_evaluations: Some(0),
            time_limit: None,
        };
        assert!(SearchParams::new(1, 4, 0.8, 1)
            .unwrap()
            .with_budget(budget)
            .is_err());
    }

    #[test]
    fn test_hit_returns_smallest_subset_over_threshold() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let run = controller(SearchParams::new(1, 4, 0.8, 2).unwrap())
            .run(&table(), &request, &CancellationToken::new())
            .unwrap();

        let SearchOutcome::Hit { winner } = &run.outcome else {
            panic!("expected hit, got {:?}", run.outcome);
        };
        assert_eq!(winner.subset.ids(), &[5, 2, 7]);
        assert!((winner.score - 0.85).abs() < 1e-6);
        // Early stop: the size-4 prefix is never evaluated.
        assert_eq!(run.stats.evaluations, 4);
        assert_eq!(run.stats.batches, 2);
    }

    #[test]
    fn test_early_stop_skips_later_batches() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let model = table();
        let run = controller(SearchParams::new(1, 8, 0.8, 1).unwrap())
            .run(&model, &request, &CancellationToken::new())
            .unwrap();
        assert!(run.outcome.is_hit());
        assert_eq!(model.calls(), 3);
    }

    #[test]
    fn test_no_pruning_evaluates_whole_range() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let params = SearchParams::new(1, 4, 0.8, 1)
            .unwrap()
            .with_prune_heuristic(PruneHeuristic::None);
        let run = controller(params)
            .run(&table(), &request, &CancellationToken::new())
            .unwrap();
        assert_eq!(run.trace.len(), 4);
        assert_eq!(run.outcome.result().map(|r| r.subset.size()), Some(3));
    }

    #[test]
    fn test_unreachable_threshold_exhausts_with_best() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let run = controller(SearchParams::new(1, 4, 0.99, 3).unwrap())
            .run(&table(), &request, &CancellationToken::new())
            .unwrap();
        match &run.outcome {
            SearchOutcome::Exhausted { best, reason } => {
                assert_eq!(*reason, ExhaustionReason::GeneratorExhausted);
                let best = best.as_ref().unwrap();
                assert_eq!(best.subset.size(), 4);
                assert!((best.score - 0.85).abs() < 1e-6);
            }
            other => panic!("expected exhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_start_beyond_ranking_makes_no_calls() {
        let (image, _, _) = fixture();
        let segments = SegmentMap::new(Array2::from_shape_fn((1, 8), |(_, x)| (x % 4) as u32))
            .unwrap();
        let scores: AttributionScores = (0..4).map(|id| (id, id as f32)).collect();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let model = table();
        let run = controller(SearchParams::new(5, 6, 0.8, 2).unwrap())
            .run(&model, &request, &CancellationToken::new())
            .unwrap();
        assert_eq!(
            run.outcome,
            SearchOutcome::Exhausted {
                best: None,
                reason: ExhaustionReason::NoCandidates
            }
        );
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_evaluation_budget_caps_work() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let params = SearchParams::new(1, 8, 0.99, 2)
            .unwrap()
            .with_budget(SearchBudget {
                max_evaluations: Some(3),
                time_limit: None,
            })
            .unwrap();
        let model = table();
        let run = controller(params)
            .run(&model, &request, &CancellationToken::new())
            .unwrap();
        assert_eq!(run.stats.evaluations, 3);
        assert_eq!(model.batch_sizes(), vec![2, 1]);
        assert!(matches!(
            run.outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustionReason::BudgetSpent,
                ..
            }
        ));
    }

    #[test]
    fn test_cancelled_before_start() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let model = table();
        let run = controller(SearchParams::new(1, 4, 0.8, 2).unwrap())
            .run(&model, &request, &cancel)
            .unwrap();
        assert!(matches!(
            run.outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustionReason::Cancelled,
                ..
            }
        ));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_deadline_ends_search_between_batches() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let params = SearchParams::new(1, 4, 0.99, 1)
            .unwrap()
            .with_budget(SearchBudget {
                max_evaluations: None,
                time_limit: Some(Duration::from_millis(20)),
            })
            .unwrap();
        let model = SlowClassifier {
            inner: table(),
            delay: Duration::from_millis(40),
        };
        let run = controller(params)
            .run(&model, &request, &CancellationToken::new())
            .unwrap();
        assert!(matches!(
            run.outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustionReason::DeadlineReached,
                ..
            }
        ));
        assert_eq!(run.stats.batches, 1);
        assert!(run.stats.batches < 4);
        assert_eq!(model.inner.calls(), 1);
    }

    #[test]
    fn test_cancel_during_batch_finishes_that_batch_only() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let cancel = CancellationToken::new();
        let model = CancellingClassifier {
            inner: table(),
            cancel: cancel.clone(),
        };
        let run = controller(SearchParams::new(1, 4, 0.99, 2).unwrap())
            .run(&model, &request, &cancel)
            .unwrap();
        assert!(matches!(
            run.outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustionReason::Cancelled,
                ..
            }
        ));
        assert_eq!(run.stats.batches, 1);
        // The in-flight batch is committed in full.
        assert_eq!(run.stats.evaluations, 2);
        assert_eq!(run.trace.len(), 2);
        assert_eq!(model.inner.calls(), 1);
    }

    #[test]
    fn test_duplicate_prefixes_are_not_reevaluated() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let params = SearchParams::new(1, 4, 0.99, 2)
            .unwrap()
            .with_prune_heuristic(PruneHeuristic::None);
        let run = controller(params)
            .run_ranked(&table(), &request, &[5, 5, 2, 2], &CancellationToken::new())
            .unwrap();
        assert_eq!(run.stats.duplicates_skipped, 2);
        let keys: Vec<_> = run.trace.iter().map(|r| r.subset.key().clone()).collect();
        let unique: HashSet<_> = keys.iter().cloned().collect();
        assert_eq!(keys.len(), unique.len());
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_inference_error_surfaces_before_commit() {
        let (image, segments, scores) = fixture();
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let err = controller(SearchParams::new(1, 4, 0.8, 3).unwrap())
            .run(&FailingClassifier, &request, &CancellationToken::new())
            .unwrap_err();
        match err {
            SearchError::Inference { candidates, .. } => {
                assert_eq!(candidates.len(), 3);
                assert_eq!(candidates[0].ids(), &[5]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_inputs_fail_before_inference() {
        let (image, segments, mut scores) = fixture();
        scores.insert(3, f32::NAN);
        let request = SearchRequest {
            image: &image,
            segments: &segments,
            scores: &scores,
            target_class: 1,
        };
        let model = table();
        let err = controller(SearchParams::new(1, 4, 0.8, 2).unwrap())
            .run(&model, &request, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SearchPhase::Evaluating.to_string(), "evaluating");
        assert_eq!(SearchPhase::Hit.to_string(), "hit");
    }
}
