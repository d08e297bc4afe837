//! Stake validation and trade recording errors.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use tfc_core::{FightId, Symbol};
use tfc_exchange::ExchangeError;
use tfc_store::StoreError;

/// Numeric context behind a stake-limit rejection.
///
/// Serialized into the API error payload so the client can show the user
/// why the order did not fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeLimitDetail {
    pub stake: Decimal,
    pub max_exposure_used: Decimal,
    pub current_exposure: Decimal,
    pub pending_notional: Decimal,
    pub order_notional: Decimal,
    pub available: Decimal,
}

impl fmt::Display for StakeLimitDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order notional {} over available {} (stake {}, max used {}, current {}, pending {})",
            self.order_notional,
            self.available,
            self.stake,
            self.max_exposure_used,
            self.current_exposure,
            self.pending_notional
        )
    }
}

/// Errors from the stake validator and trade recorder.
#[derive(Error, Debug)]
pub enum StakeError {
    /// Expected, recoverable rejection. Surface to the user, do not retry.
    #[error("stake limit exceeded: {0}")]
    StakeLimitExceeded(StakeLimitDetail),

    /// Market orders need a mark price to compute notional. No price, no
    /// validation verdict.
    #[error("mark price unavailable for {symbol}: {source}")]
    MarkPrice {
        symbol: Symbol,
        #[source]
        source: ExchangeError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Pre-fight snapshot kept moving under concurrent recording.
    #[error("trade recording conflicted {attempts} times for fight {fight_id}")]
    RecordingContention { fight_id: FightId, attempts: u32 },
}

pub type StakeResult<T> = Result<T, StakeError>;
