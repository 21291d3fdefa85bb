//! Evaluation driver tying the suite, the triggers and the ECDF engine together.
//!
//! For every problem of the suite and every run, the driver builds the
//! problem instance, resets the trigger state, tracks a fresh run key and
//! lets the solver spend its budget. Each evaluation is offered to the
//! triggers (fired ones go to the record sink) and folded into the ECDF
//! engine.
//!
//! The parallel driver splits the suite's linear problem indices into
//! disjoint ranges. Each worker owns its own trigger state and sink; the
//! workers only meet inside the ECDF engine, on distinct run keys.

use log::info;
use optbench_core::{
    AttainmentRanges, EcdfEngine, Observation, ProblemSpec, RecordSink, RunKey, Suite,
    TriggerState, Triggers,
};
use optbench_problems::{Problem, ProblemKind};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::parallel::{ParallelConfig, map_partitions};
use crate::solver::SolverKind;

/// Totals of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExperimentSummary {
    /// Problems evaluated
    pub problems: usize,
    /// Runs performed
    pub runs: usize,
    /// Evaluations performed
    pub evaluations: u64,
    /// Evaluations forwarded to the sink
    pub records: usize,
}

impl ExperimentSummary {
    fn merge(mut self, other: ExperimentSummary) -> Self {
        self.problems += other.problems;
        self.runs += other.runs;
        self.evaluations += other.evaluations;
        self.records += other.records;
        self
    }
}

/// A configured benchmark experiment.
#[derive(Debug)]
pub struct Experiment {
    suite: Suite,
    triggers: Triggers,
    engine: EcdfEngine,
    runs: usize,
    budget: u64,
    seed: u64,
    solver: SolverKind,
    parallel: ParallelConfig,
}

fn run_seed(seed: u64, key: RunKey) -> u64 {
    let mix = (key.function as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (key.dimension as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ (key.instance as u64).wrapping_mul(0x1656_67B1_9E37_79F9)
        ^ (key.run as u64);
    seed ^ mix
}

impl Experiment {
    /// Experiment with one run per problem, a budget of 1000 evaluations and
    /// the default solver.
    pub fn new(suite: Suite, triggers: Triggers, ranges: AttainmentRanges) -> Self {
        Self {
            suite,
            triggers,
            engine: EcdfEngine::new(ranges),
            runs: 1,
            budget: 1000,
            seed: 0,
            solver: SolverKind::default(),
            parallel: ParallelConfig::default(),
        }
    }

    /// Build every component from a configuration.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let run = &config.experiment;
        Ok(Self::new(
            config.suite.build()?,
            config.triggers.build()?,
            config.ecdf.build()?,
        )
        .runs(run.runs)
        .budget(run.budget)
        .seed(run.seed)
        .solver(run.solver)
        .parallel(ParallelConfig {
            enabled: run.parallel,
            num_threads: run.threads,
        }))
    }

    /// Independent runs per problem.
    pub fn runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    /// Evaluations per run.
    pub fn budget(mut self, budget: u64) -> Self {
        self.budget = budget;
        self
    }

    /// Base seed of the solvers.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Solver under test.
    pub fn solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    /// Worker configuration of [`run_parallel`](Self::run_parallel).
    pub fn parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// The enumerated suite.
    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    /// Aggregated attainments.
    pub fn engine(&self) -> &EcdfEngine {
        &self.engine
    }

    /// Solver under test.
    pub fn solver_kind(&self) -> SolverKind {
        self.solver
    }

    /// Run every problem in enumeration order on the calling thread.
    pub fn run<S: RecordSink>(&mut self, sink: &mut S) -> Result<ExperimentSummary> {
        let started = Instant::now();
        let mut state = self.triggers.state(Default::default());
        let mut summary = ExperimentSummary::default();
        self.suite.restart();
        while let Some(coordinate) = self.suite.advance() {
            let Some(spec) = self.suite.resolve(coordinate) else {
                continue;
            };
            summary = summary.merge(self.run_problem(&spec, &mut state, &mut *sink)?);
        }
        info!(
            "suite {}: {} problems, {} runs, {} evaluations in {:.2?}",
            self.suite.name(),
            summary.problems,
            summary.runs,
            summary.evaluations,
            started.elapsed()
        );
        Ok(summary)
    }

    /// Run every problem over worker threads, one sink per worker.
    ///
    /// Falls back to a single worker on the calling thread when parallelism
    /// is disabled. The attainments are identical to [`run`](Self::run)
    /// since every run is seeded from its key.
    pub fn run_parallel<S, F>(&self, make_sink: F) -> Result<(ExperimentSummary, Vec<S>)>
    where
        S: RecordSink + Send,
        F: Fn() -> S + Sync,
    {
        let started = Instant::now();
        let work = |partition: std::ops::Range<usize>| -> Result<(ExperimentSummary, S)> {
            let mut sink = make_sink();
            let mut state = self.triggers.state(Default::default());
            let mut summary = ExperimentSummary::default();
            for index in partition {
                let coordinate = self.suite.decode(index)?;
                let Some(spec) = self.suite.resolve(coordinate) else {
                    continue;
                };
                summary = summary.merge(self.run_problem(&spec, &mut state, &mut sink)?);
            }
            Ok((summary, sink))
        };

        let results = map_partitions(
            self.suite.problem_count(),
            |workers| self.suite.partition(workers),
            work,
            &self.parallel,
        )?;

        let summary = results
            .iter()
            .fold(ExperimentSummary::default(), |acc, (s, _)| acc.merge(*s));
        info!(
            "suite {}: {} problems, {} runs, {} evaluations over {} partitions in {:.2?}",
            self.suite.name(),
            summary.problems,
            summary.runs,
            summary.evaluations,
            results.len(),
            started.elapsed()
        );
        Ok((summary, results.into_iter().map(|(_, sink)| sink).collect()))
    }

    fn run_problem(
        &self,
        spec: &ProblemSpec,
        state: &mut TriggerState,
        sink: &mut dyn RecordSink,
    ) -> Result<ExperimentSummary> {
        let kind: ProblemKind = spec.name.parse()?;
        let mut problem = kind.create(spec.function, spec.dimension, spec.instance)?;
        let mut summary = ExperimentSummary {
            problems: 1,
            ..ExperimentSummary::default()
        };

        for _ in 0..self.runs {
            let run = self
                .engine
                .next_run(spec.function, spec.dimension, spec.instance);
            let key = RunKey::new(spec.function, spec.dimension, spec.instance, run);
            problem.reset();
            state.reset(problem.meta().direction);
            self.engine.track(key, problem.meta().objective());
            sink.start_run(key);

            let mut records = 0;
            let mut solver = self.solver.build(run_seed(self.seed, key));
            solver.solve(&mut problem, self.budget, &mut |observation: &Observation| {
                let firing = self.triggers.evaluate(state, observation)?;
                if firing.any() {
                    sink.record(key, observation, &firing);
                    records += 1;
                }
                self.engine.observe_observation(key, observation)?;
                Ok(())
            })?;

            summary.runs += 1;
            summary.evaluations += problem.evaluations();
            summary.records += records;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optbench_core::{MemorySink, Range, TriggerConfig};

    fn experiment(parallel: bool) -> Experiment {
        let suite = Suite::build(
            "unit",
            ["sphere", "rosenbrock"],
            vec![2, 3],
            vec![1, 2],
            &[1],
        )
        .unwrap();
        let triggers = TriggerConfig {
            interval: 25,
            ..TriggerConfig::default()
        }
        .build()
        .unwrap();
        let ranges = AttainmentRanges::new(
            Range::log10(0.0, 1e6, 20).unwrap(),
            Range::log10(1, 100, 10).unwrap(),
        );
        Experiment::new(suite, triggers, ranges)
            .runs(2)
            .budget(100)
            .seed(3)
            .parallel(ParallelConfig {
                enabled: parallel,
                num_threads: Some(2),
            })
    }

    #[test]
    fn test_sequential_run() {
        let mut experiment = experiment(false);
        let mut sink = MemorySink::new();
        let summary = experiment.run(&mut sink).unwrap();

        assert_eq!(summary.problems, 8);
        assert_eq!(summary.runs, 16);
        assert_eq!(summary.evaluations, 1600);
        assert_eq!(summary.records, sink.records().len());
        assert_eq!(sink.runs().len(), 16);
        assert_eq!(experiment.engine().tracked_runs().len(), 16);

        // runs of the same instance are numbered 1 and 2
        let runs: Vec<usize> = sink.runs().iter().map(|key| key.run).collect();
        assert!(runs.chunks(2).all(|pair| pair == [1, 2]));
        // first evaluation of every run is recorded
        for key in sink.runs() {
            let first = sink.records_of(*key).next().unwrap();
            assert_eq!(first.observation.evaluations, 1);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut sequential = experiment(false);
        let seq_summary = sequential.run(&mut MemorySink::new()).unwrap();

        let parallel = experiment(true);
        let (par_summary, sinks) = parallel.run_parallel(MemorySink::new).unwrap();
        assert_eq!(seq_summary, par_summary);
        let records: usize = sinks.iter().map(|s| s.records().len()).sum();
        assert_eq!(records, par_summary.records);

        assert_eq!(
            sequential.engine().histogram().unwrap(),
            parallel.engine().histogram().unwrap()
        );
    }

    #[test]
    fn test_filtered_problems_are_skipped() {
        let mut experiment = experiment(true);
        experiment.suite.filter_dimensions(&[3]).unwrap();

        let (summary, _) = experiment.run_parallel(MemorySink::new).unwrap();
        assert_eq!(summary.problems, 4);
        assert!(experiment
            .engine()
            .tracked_runs()
            .iter()
            .all(|key| key.dimension == 3));
    }

    #[test]
    fn test_run_seed_separates_runs() {
        let a = run_seed(1, RunKey::new(1, 2, 1, 1));
        let b = run_seed(1, RunKey::new(1, 2, 1, 2));
        let c = run_seed(2, RunKey::new(1, 2, 1, 1));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
