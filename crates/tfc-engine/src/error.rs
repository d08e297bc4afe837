//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] tfc_exchange::ExchangeError),

    #[error("Store error: {0}")]
    Store(#[from] tfc_store::StoreError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] tfc_settlement::SettlementError),

    #[error("Anti-cheat error: {0}")]
    AntiCheat(#[from] tfc_anticheat::AntiCheatError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tfc_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
