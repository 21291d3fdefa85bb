//! Continuous benchmark problems for the optbench harness.
//!
//! Problems are picked from the closed [`ProblemKind`] set and built with a
//! match-based factory, [`ProblemKind::create`]. Each instance applies a
//! seeded [`InstanceTransform`] so that instances of the same function differ
//! in optimum location and objective scale, while instance 1 stays the plain
//! textbook function.
//!
//! ```rust
//! use ndarray::Array1;
//! use optbench_problems::{Problem, ProblemKind};
//!
//! let mut problem = ProblemKind::Rastrigin.create(3, 5, 2).unwrap();
//! let obs = problem.evaluate(&Array1::zeros(5)).unwrap();
//! assert_eq!(obs.evaluations, 1);
//! assert!(obs.transformed >= problem.meta().optimum);
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{ProblemError, Result};

/// Objective functions on untransformed variables.
pub mod functions;
/// Function kinds and the problem factory.
pub mod kind;
/// Evaluable problems.
pub mod problem;
/// Seeded instance transformations.
pub mod transform;

pub use kind::ProblemKind;
pub use problem::{BenchmarkProblem, Problem, ProblemMeta};
pub use transform::InstanceTransform;
