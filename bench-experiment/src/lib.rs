//! Evaluation driver for optbench suites.
//!
//! Loads an [`ExperimentConfig`], enumerates the suite, runs a [`Solver`] on
//! every problem, samples the evaluation stream through the configured
//! triggers and aggregates the ECDF of all runs.
//!
//! ```rust
//! use optbench_experiment::{ConfigFormat, CountingSink, Experiment, parse_config};
//!
//! let config = parse_config(
//!     r#"
//!     [suite]
//!     functions = ["sphere"]
//!     dimensions = [2]
//!     instances = [1]
//!
//!     [experiment]
//!     runs = 2
//!     budget = 20
//!     parallel = false
//!     "#,
//!     ConfigFormat::Toml,
//! )
//! .unwrap();
//! let mut experiment = Experiment::from_config(&config).unwrap();
//! let mut counts = CountingSink::new();
//! let summary = experiment.run(&mut counts).unwrap();
//! assert_eq!(summary.evaluations, 40);
//! assert_eq!(counts.runs, 2);
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{ExperimentError, Result};

/// Configuration files.
pub mod config;
/// Suite driver.
pub mod experiment;
/// Worker partitioning.
pub mod parallel;
/// JSON reports.
pub mod report;
/// Tallying record sink.
pub mod sink;
/// Reference solvers.
pub mod solver;

pub use config::{
    ConfigFormat, EcdfSection, ExperimentConfig, RunSection, SuiteSection, load_config,
    parse_config, serialize_config,
};
pub use experiment::{Experiment, ExperimentSummary};
pub use parallel::{ParallelConfig, map_partitions};
pub use report::{AxisReport, Report};
pub use sink::CountingSink;
pub use solver::{EvaluationObserver, OnePlusOne, RandomSearch, Solver, SolverKind};
