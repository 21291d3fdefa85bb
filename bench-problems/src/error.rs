//! Error types for problem construction and evaluation.

use thiserror::Error;

/// Errors raised while building or evaluating benchmark problems.
#[derive(Debug, Error)]
pub enum ProblemError {
    /// No problem is registered under this name.
    #[error("unknown problem `{name}`")]
    UnknownProblem {
        /// The requested name
        name: String,
    },

    /// The problem is not defined in this dimension.
    #[error("problem `{name}` needs dimension >= {min}, got {dimension}")]
    InvalidDimension {
        /// Problem name
        name: &'static str,
        /// Requested dimension
        dimension: usize,
        /// Smallest supported dimension
        min: usize,
    },

    /// A candidate solution has the wrong length.
    #[error("solution dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Problem dimension
        expected: usize,
        /// Length of the candidate
        got: usize,
    },
}

/// A specialized `Result` type for problem operations.
pub type Result<T> = std::result::Result<T, ProblemError>;

impl ProblemError {
    /// Returns `true` if the error comes from a bad problem request.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ProblemError::UnknownProblem { .. } | ProblemError::InvalidDimension { .. }
        )
    }

    /// Returns `true` if a candidate did not match the problem dimension.
    pub fn is_dimension_error(&self) -> bool {
        matches!(self, ProblemError::DimensionMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProblemError::InvalidDimension {
            name: "rosenbrock",
            dimension: 1,
            min: 2,
        };
        assert_eq!(
            err.to_string(),
            "problem `rosenbrock` needs dimension >= 2, got 1"
        );
    }

    #[test]
    fn test_error_categories() {
        let unknown = ProblemError::UnknownProblem {
            name: "nope".to_string(),
        };
        let mismatch = ProblemError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert!(unknown.is_config_error());
        assert!(!unknown.is_dimension_error());
        assert!(mismatch.is_dimension_error());
        assert!(!mismatch.is_config_error());
    }
}
