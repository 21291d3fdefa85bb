//! Reference solvers driven by the experiment.

use ndarray::Array1;
use optbench_core::Observation;
use optbench_problems::Problem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ExperimentError, Result};

/// Callback receiving every evaluation of a run.
pub type EvaluationObserver<'a> = dyn FnMut(&Observation) -> Result<()> + 'a;

/// An optimizer under test.
pub trait Solver {
    /// Short solver name.
    fn name(&self) -> &'static str;

    /// Spend exactly `budget` evaluations on `problem`, passing each one to
    /// `observer`. Stops early on the first error.
    fn solve(
        &mut self,
        problem: &mut dyn Problem,
        budget: u64,
        observer: &mut EvaluationObserver<'_>,
    ) -> Result<()>;
}

fn uniform(rng: &mut StdRng, dimension: usize, (lower, upper): (f64, f64)) -> Array1<f64> {
    Array1::from_shape_fn(dimension, |_| rng.random_range(lower..upper))
}

/// Uniform sampling of the search box.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    rng: StdRng,
}

impl RandomSearch {
    /// Random search with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Solver for RandomSearch {
    fn name(&self) -> &'static str {
        "random-search"
    }

    fn solve(
        &mut self,
        problem: &mut dyn Problem,
        budget: u64,
        observer: &mut EvaluationObserver<'_>,
    ) -> Result<()> {
        let (dimension, bounds) = (problem.meta().dimension, problem.meta().bounds);
        for _ in 0..budget {
            let x = uniform(&mut self.rng, dimension, bounds);
            let observation = problem.evaluate(&x)?;
            observer(&observation)?;
        }
        Ok(())
    }
}

/// (1+1) local search with a box-shaped mutation and the one-fifth success rule.
#[derive(Debug, Clone)]
pub struct OnePlusOne {
    rng: StdRng,
    initial_step: f64,
}

impl OnePlusOne {
    const EXPAND: f64 = 1.5;

    /// Local search with a fixed seed and an initial step of a fifth of the box.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            initial_step: 0.2,
        }
    }
}

impl Solver for OnePlusOne {
    fn name(&self) -> &'static str {
        "one-plus-one"
    }

    fn solve(
        &mut self,
        problem: &mut dyn Problem,
        budget: u64,
        observer: &mut EvaluationObserver<'_>,
    ) -> Result<()> {
        if budget == 0 {
            return Ok(());
        }
        let (dimension, (lower, upper)) = (problem.meta().dimension, problem.meta().bounds);
        let direction = problem.meta().direction;
        let mut step = self.initial_step * (upper - lower);
        // shrinking on failure by EXPAND^(-1/4) balances one success in five
        let shrink = Self::EXPAND.powf(-0.25);

        let mut parent = uniform(&mut self.rng, dimension, (lower, upper));
        let first = problem.evaluate(&parent)?;
        observer(&first)?;
        let mut parent_value = first.transformed;

        for _ in 1..budget {
            let child = parent.mapv(|xi| {
                (xi + step * self.rng.random_range(-1.0..1.0)).clamp(lower, upper)
            });
            let observation = problem.evaluate(&child)?;
            observer(&observation)?;
            if !direction.is_better(parent_value, observation.transformed) {
                parent = child;
                parent_value = observation.transformed;
                step *= Self::EXPAND;
            } else {
                step *= shrink;
            }
            step = step.clamp(1e-12, upper - lower);
        }
        Ok(())
    }
}

/// Solvers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
    /// [`RandomSearch`]
    RandomSearch,
    /// [`OnePlusOne`]
    #[default]
    OnePlusOne,
}

impl SolverKind {
    /// Every solver kind.
    pub const ALL: [SolverKind; 2] = [SolverKind::RandomSearch, SolverKind::OnePlusOne];

    /// Configuration name.
    pub fn name(self) -> &'static str {
        match self {
            SolverKind::RandomSearch => "random-search",
            SolverKind::OnePlusOne => "one-plus-one",
        }
    }

    /// Instantiate with `seed`.
    pub fn build(self, seed: u64) -> Box<dyn Solver + Send> {
        match self {
            SolverKind::RandomSearch => Box::new(RandomSearch::new(seed)),
            SolverKind::OnePlusOne => Box::new(OnePlusOne::new(seed)),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        SolverKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| ExperimentError::InvalidSetting {
                name: "solver",
                reason: format!("unknown solver `{s}`"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optbench_problems::ProblemKind;

    fn run(kind: SolverKind, problem: ProblemKind, budget: u64) -> Vec<Observation> {
        let mut problem = problem.create(1, 4, 2).unwrap();
        let mut solver = kind.build(7);
        let mut seen = Vec::new();
        solver
            .solve(&mut problem, budget, &mut |obs: &Observation| {
                seen.push(*obs);
                Ok(())
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_solvers_spend_exact_budget() {
        for kind in SolverKind::ALL {
            let seen = run(kind, ProblemKind::Sphere, 150);
            assert_eq!(seen.len(), 150);
            let counts: Vec<u64> = seen.iter().map(|o| o.evaluations).collect();
            assert_eq!(counts, (1..=150).collect::<Vec<u64>>());
            // best-so-far never gets worse
            assert!(seen.windows(2).all(|w| w[1].best_transformed <= w[0].best_transformed));
        }
    }

    #[test]
    fn test_solvers_are_reproducible() {
        for kind in SolverKind::ALL {
            assert_eq!(
                run(kind, ProblemKind::Rastrigin, 50),
                run(kind, ProblemKind::Rastrigin, 50)
            );
        }
    }

    #[test]
    fn test_local_search_beats_random_search_on_sphere() {
        let optimum = ProblemKind::Sphere.create(1, 4, 2).unwrap().meta().optimum;
        let gap = |kind| {
            let seen = run(kind, ProblemKind::Sphere, 2000);
            seen.last().map_or(f64::INFINITY, |o| o.best_transformed - optimum)
        };
        assert!(gap(SolverKind::OnePlusOne) < gap(SolverKind::RandomSearch));
    }

    #[test]
    fn test_observer_error_stops_the_run() {
        let mut problem = ProblemKind::Sphere.create(1, 2, 1).unwrap();
        let mut solver = RandomSearch::new(1);
        let result = solver.solve(&mut problem, 100, &mut |obs: &Observation| {
            if obs.evaluations == 10 {
                return Err(ExperimentError::InvalidSetting {
                    name: "test",
                    reason: "stop".to_string(),
                });
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(problem.evaluations(), 10);
    }

    #[test]
    fn test_solver_names() {
        for kind in SolverKind::ALL {
            assert_eq!(kind.name().parse::<SolverKind>().unwrap(), kind);
            assert_eq!(kind.build(0).name(), kind.name());
        }
        assert!("cma-es".parse::<SolverKind>().is_err());
    }
}
