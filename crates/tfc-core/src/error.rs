//! Error types for tfc-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid stake: {0}")]
    InvalidStake(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
