//! Settlement orchestrator errors.
//!
//! Anything here means the run could not produce a verdict; the lock is
//! released and the reconcile job retries the fight on its next sweep.
//! Losing the lock race is not an error (the orchestrator reports it as a
//! skipped run), and neither is a failed anti-cheat rule.

use thiserror::Error;

use tfc_anticheat::AntiCheatError;
use tfc_core::FightId;
use tfc_exchange::ExchangeError;
use tfc_scoring::ScoringError;
use tfc_store::StoreError;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("fight {0} not found")]
    MissingFight(FightId),

    #[error("fight {fight_id} has {count} participants, settlement needs two")]
    MalformedFight { fight_id: FightId, count: usize },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("anti-cheat error: {0}")]
    AntiCheat(#[from] AntiCheatError),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),
}

pub type SettlementResult<T> = Result<T, SettlementError>;
