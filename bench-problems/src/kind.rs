//! The closed set of benchmark functions and their factory.

use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProblemError, Result};
use crate::functions;
use crate::problem::BenchmarkProblem;
use crate::transform::InstanceTransform;

/// Available benchmark functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemKind {
    /// Sum of squares
    Sphere,
    /// Ill-conditioned separable quadratic
    Ellipsoid,
    /// Highly multimodal separable function
    Rastrigin,
    /// Curved valley, non-separable
    Rosenbrock,
    /// Nearly flat outer region with many local minima
    Ackley,
}

impl ProblemKind {
    /// Every kind, in registration order.
    pub const ALL: [ProblemKind; 5] = [
        ProblemKind::Sphere,
        ProblemKind::Ellipsoid,
        ProblemKind::Rastrigin,
        ProblemKind::Rosenbrock,
        ProblemKind::Ackley,
    ];

    /// Lowercase name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            ProblemKind::Sphere => "sphere",
            ProblemKind::Ellipsoid => "ellipsoid",
            ProblemKind::Rastrigin => "rastrigin",
            ProblemKind::Rosenbrock => "rosenbrock",
            ProblemKind::Ackley => "ackley",
        }
    }

    /// One-line description.
    pub fn description(self) -> &'static str {
        match self {
            ProblemKind::Sphere => "Unimodal separable sum of squares",
            ProblemKind::Ellipsoid => "Unimodal separable quadratic with condition number 1e6",
            ProblemKind::Rastrigin => "Multimodal separable function with a grid of local minima",
            ProblemKind::Rosenbrock => "Unimodal non-separable banana-shaped valley",
            ProblemKind::Ackley => "Multimodal function with an almost flat outer region",
        }
    }

    /// Whether the function has local minima besides the global one.
    pub fn multimodal(self) -> bool {
        matches!(self, ProblemKind::Rastrigin | ProblemKind::Ackley)
    }

    /// Smallest dimension the function is defined for.
    pub fn min_dimension(self) -> usize {
        match self {
            ProblemKind::Rosenbrock => 2,
            _ => 1,
        }
    }

    /// Box constraints shared by every coordinate.
    pub fn bounds(self) -> (f64, f64) {
        (-5.0, 5.0)
    }

    /// Global minimizer of the untransformed function.
    pub fn optimum_location(self, dimension: usize) -> Array1<f64> {
        match self {
            ProblemKind::Rosenbrock => Array1::ones(dimension),
            _ => Array1::zeros(dimension),
        }
    }

    pub(crate) fn objective(self) -> fn(&Array1<f64>) -> f64 {
        match self {
            ProblemKind::Sphere => functions::sphere,
            ProblemKind::Ellipsoid => functions::ellipsoid,
            ProblemKind::Rastrigin => functions::rastrigin,
            ProblemKind::Rosenbrock => functions::rosenbrock,
            ProblemKind::Ackley => functions::ackley,
        }
    }

    /// Build `instance` of this function in `dimension`.
    ///
    /// `function` is the number the suite assigned to this kind; it seeds the
    /// instance transformation together with `instance`.
    pub fn create(
        self,
        function: usize,
        dimension: usize,
        instance: usize,
    ) -> Result<BenchmarkProblem> {
        if dimension < self.min_dimension() {
            return Err(ProblemError::InvalidDimension {
                name: self.name(),
                dimension,
                min: self.min_dimension(),
            });
        }
        let transform = InstanceTransform::for_instance(function, dimension, instance);
        debug!(
            "{self} (function {function}, dimension {dimension}, instance {instance}): optimum {:.2} at scale {:.3}",
            transform.offset(),
            transform.scale()
        );
        Ok(BenchmarkProblem::new(self, function, dimension, instance, transform))
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProblemKind {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        ProblemKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| ProblemError::UnknownProblem {
                name: s.to_string(),
            })
    }
}
