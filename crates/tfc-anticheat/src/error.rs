//! Anti-cheat engine errors.
//!
//! Rule failures are never errors. They are structured results; see
//! `RuleOutcome`. Errors here are infrastructure faults and malformed
//! inputs only.

use thiserror::Error;

use tfc_core::FightId;
use tfc_store::StoreError;

#[derive(Error, Debug)]
pub enum AntiCheatError {
    #[error("fight {fight_id} has {count} participants, settlement validation needs two")]
    MalformedFight { fight_id: FightId, count: usize },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type AntiCheatResult<T> = Result<T, AntiCheatError>;
