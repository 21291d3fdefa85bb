//! Error types for the benchmarking core.
//!
//! Every fallible operation of the trigger engine, the suite enumerator,
//! the ranges and the ECDF engine reports a [`BenchError`]. Variants fall in
//! three categories exposed by helper methods: configuration errors,
//! precondition violations and recoverable out-of-domain observations.

use thiserror::Error;

use crate::ecdf::RunKey;
use crate::suite::AxisKind;

/// Errors raised by the benchmarking core.
#[derive(Debug, Error)]
pub enum BenchError {
    /// A suite axis was built without any entry.
    #[error("suite axis `{axis}` is empty")]
    EmptyAxis {
        /// The empty axis
        axis: AxisKind,
    },

    /// Filtering left no included entry on an axis.
    #[error("filter leaves no entry on suite axis `{axis}`")]
    FilteredOutAxis {
        /// The axis emptied by the filter
        axis: AxisKind,
    },

    /// A filter referenced a position outside the axis (positions are 1-based).
    #[error("filter position {position} out of range for axis `{axis}` with {len} entries")]
    FilterPositionOutOfRange {
        /// The filtered axis
        axis: AxisKind,
        /// The offending 1-based position
        position: usize,
        /// Number of entries on the axis
        len: usize,
    },

    /// A dimension filter named a value the suite does not contain.
    #[error("dimension {value} is not part of the suite")]
    UnknownDimension {
        /// The requested dimension value
        value: usize,
    },

    /// Range bounds are not finite or `min >= max`.
    #[error("invalid range: min ({min}) must be finite and lower than max ({max})")]
    InvalidRange {
        /// Lower bound as given
        min: f64,
        /// Upper bound as given
        max: f64,
    },

    /// A range was requested with zero buckets.
    #[error("range must have at least one bucket")]
    ZeroBuckets,

    /// A trigger policy received an unusable parameter.
    #[error("invalid trigger parameter `{name}`: {reason}")]
    InvalidTriggerParameter {
        /// Parameter name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// An observation carried an evaluation count of zero.
    #[error("evaluation counts start at 1, got 0")]
    ZeroEvaluations,

    /// A linear problem index, coordinate component or bucket is out of bounds.
    #[error("index {index} out of bounds for {count} entries")]
    IndexOutOfBounds {
        /// The offending index
        index: usize,
        /// Number of valid entries
        count: usize,
    },

    /// Statistics were requested before any run received an in-domain observation.
    #[error("no attainment data: no tracked run received an in-domain observation")]
    NoAttainmentData,

    /// Suite filters were changed after iteration started.
    #[error("suite filters are frozen once iteration has started")]
    SuiteAlreadyStarted,

    /// An observation targeted a run key that was never tracked.
    #[error("run {key} is not tracked")]
    UntrackedRun {
        /// The unknown run key
        key: RunKey,
    },

    /// An observation fell outside the attainment domain and was dropped.
    #[error("observation (evaluations = {evaluations}, error = {error}) outside the attainment domain")]
    OutOfDomain {
        /// Evaluation count of the dropped observation
        evaluations: u64,
        /// Error value of the dropped observation
        error: f64,
    },
}

/// A specialized `Result` type for benchmarking core operations.
pub type Result<T> = std::result::Result<T, BenchError>;

impl BenchError {
    /// Returns `true` if this error comes from invalid configuration.
    ///
    /// This includes empty or fully filtered axes, bad filter positions,
    /// invalid ranges and trigger parameters.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BenchError::EmptyAxis { .. }
                | BenchError::FilteredOutAxis { .. }
                | BenchError::FilterPositionOutOfRange { .. }
                | BenchError::UnknownDimension { .. }
                | BenchError::InvalidRange { .. }
                | BenchError::ZeroBuckets
                | BenchError::InvalidTriggerParameter { .. }
        )
    }

    /// Returns `true` if the caller broke an operation's contract.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            BenchError::ZeroEvaluations
                | BenchError::IndexOutOfBounds { .. }
                | BenchError::NoAttainmentData
                | BenchError::SuiteAlreadyStarted
                | BenchError::UntrackedRun { .. }
        )
    }

    /// Returns `true` if the run can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BenchError::OutOfDomain { .. })
    }
}
