//! Store error types.

use thiserror::Error;

use tfc_core::{FightId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fight not found: {0}")]
    FightNotFound(FightId),

    #[error("Participant not found: fight {fight_id} user {user_id}")]
    ParticipantNotFound { fight_id: FightId, user_id: UserId },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
