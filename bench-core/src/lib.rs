//! Instrumentation and aggregation core for benchmarking iterative
//! optimization heuristics.
//!
//! The crate answers three questions asked millions of times per benchmark:
//!
//! - which problem comes next: [`Suite`] enumerates the
//!   (function, dimension, instance) product in a fixed order and maps every
//!   coordinate to a linear index that parallel workers can split;
//! - is this evaluation worth recording: [`Triggers`] combines independent
//!   sampling policies over the evaluation stream of a problem;
//! - how do runs compare: [`EcdfEngine`] discretizes (evaluations, error)
//!   pairs on two [`Range`]s and aggregates attainment matrices into
//!   histograms, empirical distributions and an area-under-curve score.
//!
//! # Example
//!
//! ```rust
//! use optbench_core::{AttainmentRanges, EcdfEngine, Objective, Range, RunKey};
//!
//! let engine = EcdfEngine::new(AttainmentRanges::new(
//!     Range::log10(0.0, 1e4, 20).unwrap(),
//!     Range::log10(1, 1_000, 20).unwrap(),
//! ));
//! let key = RunKey::new(1, 5, 1, engine.next_run(1, 5, 1));
//! engine.track(key, Objective::minimize());
//! for (evaluations, error) in [(1, 900.0), (10, 40.0), (200, 0.5)] {
//!     engine.observe(key, evaluations, error).unwrap();
//! }
//! let volume = engine.volume_under_curve().unwrap();
//! assert!(volume > 0.0 && volume <= 1.0);
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{BenchError, Result};

/// Per-run attainment matrices and cross-run statistics.
pub mod ecdf;
/// Evaluation events and optimization direction.
pub mod observation;
/// Bucketing of continuous and discrete intervals.
pub mod range;
/// Text rendering of distributions.
pub mod render;
/// Destinations for recorded evaluations.
pub mod sink;
/// Enumeration of suite problems.
pub mod suite;
/// Sampling policies over the evaluation stream.
pub mod trigger;

pub use ecdf::{AttainmentRanges, EcdfEngine, Objective, Observed, RunKey};
pub use observation::{Observation, OptimizationType};
pub use range::{Range, RangeConfig, Scale};
pub use render::Colormap;
pub use sink::{MemorySink, Record, RecordSink};
pub use suite::{AxisKind, ExhaustionPolicy, ProblemCoordinate, ProblemSpec, Suite};
pub use trigger::{
    All, Always, Any, At, DeltaImprovement, During, Firing, Improvement, Interval, SharedTrigger,
    TimePoints, TimeRange, Trigger, TriggerConfig, TriggerState, Triggers, TriggersBuilder,
};
