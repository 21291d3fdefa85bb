//! Evaluable problems reporting one [`Observation`] per evaluation.

use ndarray::Array1;
use optbench_core::{Objective, Observation, OptimizationType};

use crate::error::{ProblemError, Result};
use crate::kind::ProblemKind;
use crate::transform::InstanceTransform;

/// Static description of a problem instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemMeta {
    /// Function kind
    pub kind: ProblemKind,
    /// Function number in the suite
    pub function: usize,
    /// Search-space dimension
    pub dimension: usize,
    /// Instance id
    pub instance: usize,
    /// Optimization direction
    pub direction: OptimizationType,
    /// Box constraints shared by every coordinate
    pub bounds: (f64, f64),
    /// Optimal transformed value
    pub optimum: f64,
    /// Location of the optimum
    pub optimum_location: Array1<f64>,
}

impl ProblemMeta {
    /// How the ECDF engine should measure errors on this problem.
    pub fn objective(&self) -> Objective {
        Objective {
            direction: self.direction,
            optimum: Some(self.optimum),
        }
    }
}

/// A problem an optimizer can evaluate.
///
/// Implementations count evaluations and track the best-so-far values of
/// the current run.
pub trait Problem {
    /// Static description.
    fn meta(&self) -> &ProblemMeta;

    /// Evaluate `x`, returning the evaluation event.
    fn evaluate(&mut self, x: &Array1<f64>) -> Result<Observation>;

    /// Evaluations performed since the last reset.
    fn evaluations(&self) -> u64;

    /// Best `(raw, transformed)` values since the last reset.
    fn best(&self) -> Option<(f64, f64)>;

    /// Forget the current run.
    fn reset(&mut self);
}

/// A [`ProblemKind`] instance behind its instance transformation.
#[derive(Debug, Clone)]
pub struct BenchmarkProblem {
    meta: ProblemMeta,
    objective: fn(&Array1<f64>) -> f64,
    transform: InstanceTransform,
    evaluations: u64,
    best: Option<(f64, f64)>,
}

impl BenchmarkProblem {
    pub(crate) fn new(
        kind: ProblemKind,
        function: usize,
        dimension: usize,
        instance: usize,
        transform: InstanceTransform,
    ) -> Self {
        let meta = ProblemMeta {
            kind,
            function,
            dimension,
            instance,
            direction: OptimizationType::Minimization,
            bounds: kind.bounds(),
            optimum: transform.objective(0.0),
            optimum_location: kind.optimum_location(dimension) + transform.shift(),
        };
        Self {
            meta,
            objective: kind.objective(),
            transform,
            evaluations: 0,
            best: None,
        }
    }

    /// Instance transformation in use.
    pub fn transform(&self) -> &InstanceTransform {
        &self.transform
    }
}

impl Problem for BenchmarkProblem {
    fn meta(&self) -> &ProblemMeta {
        &self.meta
    }

    fn evaluate(&mut self, x: &Array1<f64>) -> Result<Observation> {
        if x.len() != self.meta.dimension {
            return Err(ProblemError::DimensionMismatch {
                expected: self.meta.dimension,
                got: x.len(),
            });
        }
        let raw = (self.objective)(&self.transform.variables(x));
        let transformed = self.transform.objective(raw);
        self.evaluations += 1;

        let direction = self.meta.direction;
        let best = match self.best {
            Some((best_raw, best_transformed))
                if !direction.is_better(transformed, best_transformed) =>
            {
                (best_raw, best_transformed)
            }
            _ => (raw, transformed),
        };
        self.best = Some(best);

        Ok(Observation::new(self.evaluations, raw, transformed, direction)
            .with_best(best.0, best.1))
    }

    fn evaluations(&self) -> u64 {
        self.evaluations
    }

    fn best(&self) -> Option<(f64, f64)> {
        self.best
    }

    fn reset(&mut self) {
        self.evaluations = 0;
        self.best = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_evaluate_counts_and_tracks_best() {
        let mut problem = ProblemKind::Sphere.create(1, 2, 1).unwrap();
        let first = problem.evaluate(&array![1.0, 1.0]).unwrap();
        let second = problem.evaluate(&array![2.0, 0.0]).unwrap();
        let third = problem.evaluate(&array![0.0, 0.5]).unwrap();

        assert_eq!(first.evaluations, 1);
        assert_eq!(second.evaluations, 2);
        assert_eq!(second.transformed, 4.0);
        assert_eq!(second.best_transformed, 2.0);
        assert_eq!(third.best_transformed, 0.25);
        assert_eq!(problem.best(), Some((0.25, 0.25)));

        problem.reset();
        assert_eq!(problem.evaluations(), 0);
        assert_eq!(problem.best(), None);
        assert_eq!(problem.evaluate(&array![1.0, 0.0]).unwrap().evaluations, 1);
    }

    #[test]
    fn test_transformed_optimum_is_reached_at_optimum_location() {
        for kind in ProblemKind::ALL {
            for instance in [1, 2, 9] {
                let mut problem = kind.create(3, 4, instance).unwrap();
                let meta = problem.meta().clone();
                let obs = problem.evaluate(&meta.optimum_location).unwrap();
                assert_abs_diff_eq!(obs.transformed, meta.optimum, epsilon = 1e-9);
                assert_abs_diff_eq!(obs.raw, 0.0, epsilon = 1e-9);
                assert_eq!(meta.objective().optimum, Some(meta.optimum));
            }
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut problem = ProblemKind::Ackley.create(5, 3, 2).unwrap();
        let err = problem.evaluate(&array![0.0, 0.0]).unwrap_err();
        assert!(err.is_dimension_error());
        assert_eq!(problem.evaluations(), 0);
    }
}
