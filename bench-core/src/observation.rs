//! Evaluation events flowing from problems into triggers and the ECDF engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of optimization for a single-objective problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationType {
    /// Lower objective values are better.
    #[default]
    Minimization,
    /// Higher objective values are better.
    Maximization,
}

impl OptimizationType {
    /// Worst possible objective value, used to seed best-so-far trackers.
    pub fn worst(self) -> f64 {
        match self {
            OptimizationType::Minimization => f64::INFINITY,
            OptimizationType::Maximization => f64::NEG_INFINITY,
        }
    }

    /// Strict comparison: `candidate` beats `incumbent`.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            OptimizationType::Minimization => candidate < incumbent,
            OptimizationType::Maximization => candidate > incumbent,
        }
    }
}

impl fmt::Display for OptimizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationType::Minimization => write!(f, "minimization"),
            OptimizationType::Maximization => write!(f, "maximization"),
        }
    }
}

/// One evaluation of a problem.
///
/// `evaluations` is the 1-based count of evaluations performed so far on the
/// current run, including this one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Evaluation count, starting at 1
    pub evaluations: u64,
    /// Objective value before the instance transformation
    pub raw: f64,
    /// Objective value after the instance transformation
    pub transformed: f64,
    /// Best raw value seen so far on this run
    pub best_raw: f64,
    /// Best transformed value seen so far on this run
    pub best_transformed: f64,
    /// Optimization direction of the problem
    pub direction: OptimizationType,
}

impl Observation {
    /// Observation whose best-so-far values equal the current values.
    pub fn new(evaluations: u64, raw: f64, transformed: f64, direction: OptimizationType) -> Self {
        Self {
            evaluations,
            raw,
            transformed,
            best_raw: raw,
            best_transformed: transformed,
            direction,
        }
    }

    /// Replace the best-so-far values.
    pub fn with_best(mut self, best_raw: f64, best_transformed: f64) -> Self {
        self.best_raw = best_raw;
        self.best_transformed = best_transformed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_comparisons() {
        let min = OptimizationType::Minimization;
        let max = OptimizationType::Maximization;

        assert!(min.is_better(1.0, 2.0));
        assert!(!min.is_better(2.0, 2.0));
        assert!(max.is_better(3.0, 2.0));
        assert!(!max.is_better(2.0, 2.0));
        assert!(min.is_better(1e300, min.worst()));
        assert!(max.is_better(-1e300, max.worst()));
    }

    #[test]
    fn test_with_best() {
        let obs = Observation::new(4, 3.0, 6.0, OptimizationType::Minimization).with_best(1.0, 2.0);
        assert_eq!(obs.evaluations, 4);
        assert_eq!(obs.transformed, 6.0);
        assert_eq!(obs.best_transformed, 2.0);
        assert_eq!(obs.best_raw, 1.0);
    }
}
