//! Behavioural properties of the search engine, checked end to end with the
//! in-memory classifiers from `cse_core::mocks`.

use std::collections::HashSet;

use cse_core::config::MaskingConfig;
use cse_core::evaluator::{BatchEvaluator, ScoreActivation};
use cse_core::mocks::{PixelSumClassifier, TableClassifier};
use cse_core::ranking::{rank, AttributionScores};
use cse_core::{
    Background, CancellationToken, CandidateSubset, ExhaustionReason, ImageTensor, MaskBuilder,
    MaskPolicy, PrefixGenerator, PruneHeuristic, SearchController, SearchOutcome, SearchParams,
    SearchRequest, SegmentMap,
};
use ndarray::{Array2, Array3};

/// Four one-pixel segments labelled 5, 2, 7, 1 whose scores rank them in
/// that order. With an all-ones image, keep-only masking and a zero
/// background, a [`TableClassifier`] scores a subset by its size.
struct Fixture {
    image: ImageTensor,
    segments: SegmentMap,
    scores: AttributionScores,
}

impl Fixture {
    fn new() -> Self {
        let segments = SegmentMap::new(Array2::from_shape_vec((1, 4), vec![5, 2, 7, 1]).unwrap())
            .unwrap();
        let scores: AttributionScores = [(5, 0.9), (2, 0.8), (7, 0.7), (1, 0.6)].into_iter().collect();
        Self {
            image: ImageTensor::ones((1, 1, 4)),
            segments,
            scores,
        }
    }

    fn request(&self) -> SearchRequest<'_> {
        SearchRequest {
            image: &self.image,
            segments: &self.segments,
            scores: &self.scores,
            target_class: 1,
        }
    }
}

fn keep_only_zero() -> MaskingConfig {
    MaskingConfig {
        policy: MaskPolicy::KeepOnly,
        background: Background::Zero,
        parallel: true,
    }
}

fn controller(params: SearchParams) -> SearchController {
    SearchController::new(params, keep_only_zero(), ScoreActivation::Identity).unwrap()
}

/// Scores 0.3, 0.3, 0.85, 0.85 for subsets of size 1..=4.
fn scenario_table() -> TableClassifier {
    TableClassifier::new(vec![0.0, 0.3, 0.3, 0.85, 0.85])
}

#[test]
fn test_fixture_ranks_as_expected() {
    assert_eq!(rank(&Fixture::new().scores).unwrap(), vec![5, 2, 7, 1]);
}

#[test]
fn test_scenario_threshold_reached_at_size_three() {
    let fixture = Fixture::new();
    let run = controller(SearchParams::new(1, 4, 0.8, 16).unwrap())
        .run(&scenario_table(), &fixture.request(), &CancellationToken::new())
        .unwrap();

    match run.outcome {
        SearchOutcome::Hit { winner } => {
            assert_eq!(winner.subset.ids(), &[5, 2, 7]);
            assert_eq!(winner.subset.key().ids(), &[2, 5, 7]);
            assert!((winner.score - 0.85).abs() < 1e-6);
        }
        other => panic!("expected hit, got {other:?}"),
    }
}

#[test]
fn test_scenario_unreachable_threshold() {
    let fixture = Fixture::new();
    let run = controller(SearchParams::new(1, 4, 0.99, 2).unwrap())
        .run(&scenario_table(), &fixture.request(), &CancellationToken::new())
        .unwrap();

    match run.outcome {
        SearchOutcome::Exhausted {
            best: Some(best),
            reason,
        } => {
            assert_eq!(reason, ExhaustionReason::GeneratorExhausted);
            assert_eq!(best.subset.size(), 4);
            assert!((best.score - 0.85).abs() < 1e-6);
        }
        other => panic!("expected exhausted with best, got {other:?}"),
    }
    assert_eq!(run.trace.len(), 4);
}

#[test]
fn test_scenario_start_beyond_ranking() {
    let fixture = Fixture::new();
    let model = scenario_table();
    let run = controller(SearchParams::new(5, 8, 0.8, 4).unwrap())
        .run(&model, &fixture.request(), &CancellationToken::new())
        .unwrap();

    assert_eq!(
        run.outcome,
        SearchOutcome::Exhausted {
            best: None,
            reason: ExhaustionReason::NoCandidates,
        }
    );
    assert_eq!(model.calls(), 0);
    assert!(run.trace.is_empty());
}

#[test]
fn test_search_is_deterministic() {
    let image = Array3::from_shape_fn((3, 6, 6), |(c, y, x)| ((c + 2 * y + 3 * x) % 7) as f32 / 7.0);
    let segments = SegmentMap::new(Array2::from_shape_fn((6, 6), |(y, x)| (y / 2 * 3 + x / 2) as u32))
        .unwrap();
    let scores: AttributionScores = (0..9).map(|id| (id, ((id * 5) % 9) as f32 * 0.1)).collect();
    let request = SearchRequest {
        image: &image,
        segments: &segments,
        scores: &scores,
        target_class: 1,
    };
    let model = PixelSumClassifier::new(40.0);
    let params = SearchParams::new(1, 9, 0.6, 3)
        .unwrap()
        .with_prune_heuristic(PruneHeuristic::None);

    let first = controller(params.clone())
        .run(&model, &request, &CancellationToken::new())
        .unwrap();
    let second = controller(params)
        .run(&model, &request, &CancellationToken::new())
        .unwrap();
    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.trace, second.trace);
}

#[test]
fn test_rank_is_a_monotone_permutation() {
    let scores: AttributionScores = [(4, 0.5), (0, 0.5), (9, -1.0), (3, 2.0), (7, 0.5), (1, 0.0)]
        .into_iter()
        .collect();
    let ranked = rank(&scores).unwrap();

    let mut sorted = ranked.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, scores.keys().copied().collect::<Vec<_>>());

    for pair in ranked.windows(2) {
        let (a, b) = (scores[&pair[0]], scores[&pair[1]]);
        assert!(a >= b);
        if a == b {
            assert!(pair[0] < pair[1]);
        }
    }
    assert_eq!(ranked, vec![3, 0, 4, 7, 1, 9]);
}

#[test]
fn test_generated_subsets_grow_strictly() {
    let ranked = [8, 3, 6, 1, 0, 4];
    let subsets: Vec<CandidateSubset> =
        PrefixGenerator::new(&ranked, 2, 10, PruneHeuristic::None).collect();

    assert_eq!(subsets.len(), 5);
    assert_eq!(subsets[0].size(), 2);
    for pair in subsets.windows(2) {
        assert_eq!(pair[1].size(), pair[0].size() + 1);
        assert!(pair[0].is_strict_subset_of(&pair[1]));
    }
}

#[test]
fn test_batch_size_does_not_change_scores() {
    let image = Array3::from_shape_fn((1, 4, 4), |(_, y, x)| (y * 4 + x) as f32 / 16.0);
    let segments = SegmentMap::new(Array2::from_shape_fn((4, 4), |(y, x)| (y / 2 * 2 + x / 2) as u32))
        .unwrap();
    let builder = MaskBuilder::new(&image, &segments, MaskPolicy::Occlude, Background::ChannelMean)
        .unwrap();
    let subsets: Vec<CandidateSubset> =
        PrefixGenerator::new(&[2, 0, 3, 1], 1, 4, PruneHeuristic::None).collect();
    let tensors = builder.build_batch(&subsets, true);
    let model = PixelSumClassifier::new(8.0);

    let single = BatchEvaluator::new(1, ScoreActivation::Softmax)
        .unwrap()
        .evaluate(&model, &subsets, &tensors, 1)
        .unwrap();
    let whole = BatchEvaluator::new(subsets.len(), ScoreActivation::Softmax)
        .unwrap()
        .evaluate(&model, &subsets, &tensors, 1)
        .unwrap();
    assert_eq!(single, whole);
}

#[test]
fn test_stop_returns_smallest_subset_over_threshold() {
    let tables: [&[f32]; 5] = [
        &[0.0, 0.9, 0.1, 0.1, 0.1],
        &[0.0, 0.1, 0.2, 0.3, 0.95],
        &[0.0, 0.5, 0.81, 0.5, 0.99],
        &[0.0, 0.1, 0.1, 0.1, 0.1],
        &[0.0, 0.79, 0.8, 0.8, 0.8],
    ];
    let threshold = 0.8;
    let fixture = Fixture::new();

    for table in tables {
        let expected = (1..=4).find(|&n| table[n] >= threshold);
        for batch in 1..=4 {
            for heuristic in [PruneHeuristic::None, PruneHeuristic::EarlyStop] {
                let params = SearchParams::new(1, 4, threshold, batch)
                    .unwrap()
                    .with_prune_heuristic(heuristic);
                let run = controller(params)
                    .run(
                        &TableClassifier::new(table.to_vec()),
                        &fixture.request(),
                        &CancellationToken::new(),
                    )
                    .unwrap();
                match (expected, &run.outcome) {
                    (Some(size), SearchOutcome::Hit { winner }) => {
                        assert_eq!(winner.subset.size(), size, "table {table:?} batch {batch}");
                    }
                    (None, SearchOutcome::Exhausted { reason, .. }) => {
                        assert_eq!(*reason, ExhaustionReason::GeneratorExhausted);
                    }
                    (expected, outcome) => {
                        panic!("table {table:?}: expected {expected:?}, got {outcome:?}")
                    }
                }
            }
        }
    }
}

#[test]
fn test_no_subset_key_evaluated_twice() {
    let fixture = Fixture::new();
    let params = SearchParams::new(1, 6, 0.99, 2)
        .unwrap()
        .with_prune_heuristic(PruneHeuristic::None);
    let run = controller(params)
        .run_ranked(
            &scenario_table(),
            &fixture.request(),
            &[5, 2, 2, 7, 5, 1],
            &CancellationToken::new(),
        )
        .unwrap();

    let keys: Vec<_> = run.trace.iter().map(|r| r.subset.key().clone()).collect();
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len());
    assert_eq!(run.stats.duplicates_skipped, 2);
    assert_eq!(run.stats.evaluations, keys.len());
}
