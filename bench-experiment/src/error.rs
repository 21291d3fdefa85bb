//! Error types for the evaluation driver.

use optbench_core::BenchError;
use optbench_problems::ProblemError;
use thiserror::Error;

/// Errors raised while configuring or running an experiment.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Error from the benchmarking core.
    #[error(transparent)]
    Bench(#[from] BenchError),

    /// Error from problem construction or evaluation.
    #[error(transparent)]
    Problem(#[from] ProblemError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration could not be serialized.
    #[error("serialize error: {0}")]
    Serialize(String),

    /// Configuration file extension is neither `.toml` nor `.json`.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// An experiment setting is unusable.
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The worker thread pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A specialized `Result` type for experiment operations.
pub type Result<T> = std::result::Result<T, ExperimentError>;

impl ExperimentError {
    /// Returns `true` if the error comes from configuration.
    pub fn is_config_error(&self) -> bool {
        match self {
            ExperimentError::Bench(err) => err.is_config_error(),
            ExperimentError::Problem(err) => err.is_config_error(),
            ExperimentError::Parse(_)
            | ExperimentError::UnsupportedFormat(_)
            | ExperimentError::InvalidSetting { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_config_error() {
        let wrapped: ExperimentError = BenchError::ZeroBuckets.into();
        assert!(wrapped.is_config_error());
        assert_eq!(wrapped.to_string(), "range must have at least one bucket");

        let precondition: ExperimentError = BenchError::ZeroEvaluations.into();
        assert!(!precondition.is_config_error());

        let setting = ExperimentError::InvalidSetting {
            name: "runs",
            reason: "must be positive".to_string(),
        };
        assert!(setting.is_config_error());
        assert_eq!(setting.to_string(), "invalid setting `runs`: must be positive");
    }
}
