//! Exchange adapter error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Decimal parse error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
