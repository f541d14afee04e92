// polaris_core/src/error.rs

use thiserror::Error;

/// Reasons an estimator core refuses an initial state seed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("seed rejected by estimator core: {reason}")]
    Rejected { reason: String },

    #[error("seed covariance has dimension {found}, core expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}
