//! End-to-end tests of the benchmarking core: enumerate a suite, drive a
//! synthetic evaluation stream through the triggers and the ECDF engine.

use approx::assert_relative_eq;
use optbench_core::{
    AttainmentRanges, AxisKind, EcdfEngine, MemorySink, Objective, Observation,
    OptimizationType, Range, RecordSink, RunKey, Suite, TriggerConfig, Triggers,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random search on a shifted sphere, reporting one observation per evaluation.
fn sphere_stream(dimension: usize, instance: usize, run: usize, budget: u64) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64((instance * 1000 + run) as u64);
    let shift = instance as f64 * 0.1;
    let mut best = f64::INFINITY;
    (1..=budget)
        .map(|evaluations| {
            let value: f64 = (0..dimension)
                .map(|_| {
                    let x: f64 = rng.random_range(-5.0..5.0);
                    (x - shift).powi(2)
                })
                .sum();
            best = best.min(value);
            Observation::new(evaluations, value, value, OptimizationType::Minimization)
                .with_best(best, best)
        })
        .collect()
}

fn engine() -> EcdfEngine {
    EcdfEngine::new(AttainmentRanges::new(
        Range::log10(0.0, 1e3, 30).unwrap(),
        Range::log10(1, 500, 25).unwrap(),
    ))
}

#[test]
fn test_full_pipeline() {
    let mut suite = Suite::build(
        "synthetic",
        ["sphere", "sphere-copy", "sphere-extra"],
        vec![2, 5],
        vec![1, 2, 3],
        &[1],
    )
    .unwrap();
    suite.filter(AxisKind::Function, &[1, 3]).unwrap();

    let triggers = TriggerConfig {
        interval: 50,
        ..TriggerConfig::default()
    }
    .build()
    .unwrap();
    let engine = engine();
    let mut sink = MemorySink::new();
    let runs = 2;

    while let Some(coordinate) = suite.advance() {
        let spec = suite.resolve(coordinate).unwrap();
        for _ in 0..runs {
            let run = engine.next_run(spec.function, spec.dimension, spec.instance);
            let key = RunKey::new(spec.function, spec.dimension, spec.instance, run);
            engine.track(key, Objective::minimize().with_optimum(0.0));
            let mut state = triggers.state(OptimizationType::Minimization);
            sink.start_run(key);
            for obs in sphere_stream(spec.dimension, spec.instance, run, 500) {
                let firing = triggers.evaluate(&mut state, &obs).unwrap();
                if firing.any() {
                    sink.record(key, &obs, &firing);
                }
                engine.observe_observation(key, &obs).unwrap();
            }
        }
    }

    // 2 functions x 2 dimensions x 3 instances x 2 runs
    assert_eq!(sink.runs().len(), 24);
    assert_eq!(engine.tracked_runs().len(), 24);
    assert_eq!(engine.len(), 24);

    for key in sink.runs() {
        let records: Vec<_> = sink.records_of(*key).collect();
        let first = records.first().unwrap();
        assert_eq!(first.observation.evaluations, 1);
        assert!(first.firing.improvement && first.firing.interval && first.firing.time_points);
        assert!(records.iter().any(|r| r.observation.evaluations == 500 && r.firing.interval));
        // improvements are strictly decreasing
        let improvements: Vec<f64> = records
            .iter()
            .filter(|r| r.firing.improvement)
            .map(|r| r.observation.transformed)
            .collect();
        assert!(improvements.windows(2).all(|w| w[1] < w[0]));
    }

    let histogram = engine.histogram().unwrap();
    assert!(histogram.iter().all(|&count| count <= 24));
    let distribution = engine.distribution().unwrap();
    assert!(distribution.iter().all(|&p| (0.0..=1.0).contains(&p)));
    let (rows, cols) = distribution.dim();
    assert_relative_eq!(distribution[[rows - 1, cols - 1]], 1.0);

    let volume = engine.volume_under_curve().unwrap();
    assert!(volume > 0.0 && volume < 1.0, "volume {volume}");
}

#[test]
fn test_parallel_partitions_cover_suite_once() {
    use rayon::prelude::*;

    let suite = Suite::build(
        "parallel",
        ["a", "b", "c", "d"],
        vec![2, 3, 5],
        vec![1, 2],
        &[1],
    )
    .unwrap();
    let engine = engine();
    let triggers = Triggers::builder().improvement(true).build().unwrap();

    let recorded: usize = suite
        .partition(5)
        .into_par_iter()
        .map(|range| {
            let mut sink = MemorySink::new();
            for index in range {
                let coordinate = suite.decode(index).unwrap();
                let Some(spec) = suite.resolve(coordinate) else {
                    continue;
                };
                let key = RunKey::new(spec.function, spec.dimension, spec.instance, 1);
                engine.track(key, Objective::minimize());
                let mut state = triggers.state(OptimizationType::Minimization);
                for obs in sphere_stream(spec.dimension, spec.instance, 1, 100) {
                    if triggers.evaluate(&mut state, &obs).unwrap().any() {
                        sink.record(key, &obs, &Default::default());
                    }
                    engine.observe_observation(key, &obs).unwrap();
                }
            }
            sink.records().len()
        })
        .sum();

    assert!(recorded >= suite.problem_count());
    let keys = engine.tracked_runs();
    assert_eq!(keys.len(), suite.problem_count());
    let mut unique = keys.clone();
    unique.dedup();
    assert_eq!(unique.len(), keys.len());
}

#[test]
fn test_interval_scenario() {
    let triggers = Triggers::builder().interval(2).build().unwrap();
    let mut state = triggers.state(OptimizationType::Minimization);
    let fired: Vec<u64> = (1..=6)
        .filter(|&e| {
            let obs = Observation::new(e, 0.0, 0.0, OptimizationType::Minimization);
            triggers.evaluate(&mut state, &obs).unwrap().any()
        })
        .collect();
    assert_eq!(fired, vec![1, 2, 4, 6]);
}

#[test]
fn test_suite_scenario() {
    let mut suite = Suite::build("scenario", ["f1", "f2"], vec![4], vec![1], &[1]).unwrap();
    let mut produced = Vec::new();
    while let Some(coordinate) = suite.advance() {
        let spec = suite.resolve(coordinate).unwrap();
        produced.push((spec.function, spec.dimension, spec.instance));
    }
    assert_eq!(produced, vec![(1, 4, 1), (2, 4, 1)]);
}
