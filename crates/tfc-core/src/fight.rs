//! Fight lifecycle types.
//!
//! A fight is a time-boxed, fixed-stake 1v1 trading competition. The types
//! here carry the full settlement-relevant state: status, stake, schedule,
//! outcome, and the per-fight settlement lock fields.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::ids::{AccountId, FightId, Symbol, UserId};

/// Fight durations offered by the platform, in minutes.
pub const ALLOWED_DURATIONS_MIN: [u32; 4] = [5, 15, 30, 60];

/// Fight stakes offered by the platform, in whole USDC.
pub const ALLOWED_STAKES_USDC: [u32; 4] = [10, 50, 100, 500];

// ============================================================================
// Status
// ============================================================================

/// Fight status. Transitions are monotonic:
/// WAITING -> LIVE -> {FINISHED | NO_CONTEST}, or WAITING -> CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FightStatus {
    Waiting,
    Live,
    Finished,
    Cancelled,
    NoContest,
}

impl FightStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::NoContest)
    }

    /// True while the fight is in progress and settleable.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Whether a transition to `next` is allowed.
    pub fn can_transition_to(&self, next: FightStatus) -> bool {
        match (self, next) {
            (Self::Waiting, Self::Live) => true,
            (Self::Waiting, Self::Cancelled) => true,
            (Self::Live, Self::Finished) => true,
            (Self::Live, Self::NoContest) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Live => write!(f, "LIVE"),
            Self::Finished => write!(f, "FINISHED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::NoContest => write!(f, "NO_CONTEST"),
        }
    }
}

/// Participant slot. Slot A is always the fight creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FightSlot {
    A,
    B,
}

impl fmt::Display for FightSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

// ============================================================================
// Fight
// ============================================================================

/// One competitive session between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fight {
    pub id: FightId,
    pub status: FightStatus,
    /// Duration in minutes, from `ALLOWED_DURATIONS_MIN`.
    pub duration_min: u32,
    /// Virtual stake in USDC, from `ALLOWED_STAKES_USDC`.
    pub stake: Decimal,
    pub creator: UserId,
    pub started_at: Option<DateTime<Utc>>,
    /// Scheduled end, stamped when the fight goes LIVE.
    pub ends_at: Option<DateTime<Utc>>,
    pub winner: Option<UserId>,
    pub is_draw: bool,
    /// Settlement lock: when the current holder acquired it.
    pub settling_at: Option<DateTime<Utc>>,
    /// Settlement lock: process id of the current holder.
    pub settling_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Fight {
    /// Create a WAITING fight, validating stake and duration against the
    /// platform's allowed sets.
    pub fn new(creator: UserId, duration_min: u32, stake: Decimal) -> CoreResult<Self> {
        if !ALLOWED_DURATIONS_MIN.contains(&duration_min) {
            return Err(CoreError::InvalidDuration(format!(
                "{duration_min} min not in allowed set {ALLOWED_DURATIONS_MIN:?}"
            )));
        }
        let allowed = ALLOWED_STAKES_USDC
            .iter()
            .any(|s| Decimal::from(*s) == stake);
        if !allowed {
            return Err(CoreError::InvalidStake(format!(
                "{stake} USDC not in allowed set {ALLOWED_STAKES_USDC:?}"
            )));
        }
        Ok(Self {
            id: FightId::new(),
            status: FightStatus::Waiting,
            duration_min,
            stake,
            creator,
            started_at: None,
            ends_at: None,
            winner: None,
            is_draw: false,
            settling_at: None,
            settling_by: None,
            created_at: Utc::now(),
        })
    }

    /// Transition WAITING -> LIVE and stamp the schedule.
    pub fn start(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_transition_to(FightStatus::Live) {
            return Err(CoreError::InvalidTransition(format!(
                "cannot start fight in status {}",
                self.status
            )));
        }
        self.status = FightStatus::Live;
        self.started_at = Some(now);
        self.ends_at = Some(now + Duration::minutes(i64::from(self.duration_min)));
        Ok(())
    }

    /// True once the scheduled end has passed by at least `grace`.
    pub fn is_past_end(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        match self.ends_at {
            Some(ends_at) => now >= ends_at + grace,
            None => false,
        }
    }
}

// ============================================================================
// Participant
// ============================================================================

/// Pre-fight position held on the exchange when the fight started.
///
/// `amount` is signed: positive long, negative short. The stored snapshot is
/// the *remaining* pre-fight position; trade recording decrements it as
/// fills consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialPosition {
    pub symbol: Symbol,
    pub amount: Decimal,
}

/// One user's membership in one fight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightParticipant {
    pub fight_id: FightId,
    pub user_id: UserId,
    /// Exchange account the user trades the fight from.
    pub account: AccountId,
    pub slot: FightSlot,
    /// Final USDC score, populated at settlement.
    pub final_score: Option<Decimal>,
    /// Final PnL percent, populated at settlement.
    pub final_pnl_percent: Option<Decimal>,
    pub trades_count: u32,
    /// High-water mark of notional exposure, monotonically non-decreasing.
    pub max_exposure_used: Decimal,
    /// Remaining pre-fight positions (decremented by trade recording).
    pub initial_positions: Vec<InitialPosition>,
    /// Stamped by the upstream fill-matching system when fills outside the
    /// fight window are attributed to this participant.
    pub external_trades_detected: bool,
    /// Exchange trade ids behind the external-trades flag.
    pub external_trade_ids: Vec<String>,
    pub joined_at: DateTime<Utc>,
}

impl FightParticipant {
    pub fn new(fight_id: FightId, user_id: UserId, account: AccountId, slot: FightSlot) -> Self {
        Self {
            fight_id,
            user_id,
            account,
            slot,
            final_score: None,
            final_pnl_percent: None,
            trades_count: 0,
            max_exposure_used: Decimal::ZERO,
            initial_positions: Vec::new(),
            external_trades_detected: false,
            external_trade_ids: Vec::new(),
            joined_at: Utc::now(),
        }
    }

    pub fn with_initial_positions(mut self, positions: Vec<InitialPosition>) -> Self {
        self.initial_positions = positions;
        self
    }

    /// Remaining signed pre-fight amount for a symbol (zero if none).
    pub fn remaining_prefight(&self, symbol: &Symbol) -> Decimal {
        self.initial_positions
            .iter()
            .find(|p| &p.symbol == symbol)
            .map(|p| p.amount)
            .unwrap_or(Decimal::ZERO)
    }
}
