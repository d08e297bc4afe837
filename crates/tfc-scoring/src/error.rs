//! Error types for tfc-scoring.

use rust_decimal::Decimal;
use thiserror::Error;

/// Scoring validation errors. These fail fast; corrupted inputs must never
/// be silently coerced into a score.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Stake must be positive, got {0}")]
    NonPositiveStake(Decimal),

    #[error("Numeric overflow computing {0}")]
    NumericOverflow(&'static str),
}

/// Result type alias for scoring operations.
pub type ScoringResult<T> = std::result::Result<T, ScoringError>;
