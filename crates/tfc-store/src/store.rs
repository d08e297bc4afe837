//! The `FightStore` trait: persistence intents of the settlement core.
//!
//! Implementations must honor the atomicity notes on each method. The
//! bundled `MemoryStore` serializes per-fight mutations through a per-row
//! mutex; a relational implementation would use row locks
//! (`SELECT ... FOR UPDATE`), conditional updates, and `GREATEST` clamps.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tfc_core::{
    AntiCheatViolation, Fight, FightOrderAction, FightParticipant, FightSession, FightStatus,
    FightTrade, FightId, Symbol, UserId,
};

use crate::error::StoreResult;

/// Outcome of a settlement-lock acquisition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LockAttempt {
    Acquired,
    /// Another process holds a fresh lock.
    Held { by: String, since: DateTime<Utc> },
    /// The fight is no longer LIVE; settlement must not proceed.
    NotLive { status: FightStatus },
    NotFound,
}

impl LockAttempt {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// Adjustment to the participant's remaining pre-fight snapshot,
/// applied atomically with the trade append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefightDraw {
    pub symbol: Symbol,
    /// Signed delta added to the stored snapshot amount. A SELL consuming
    /// pre-fight long carries a negative delta; a BUY consuming pre-fight
    /// short a positive one. Always moves the snapshot toward zero.
    pub delta: Decimal,
    /// Snapshot amount the caller based its decision on; the store rejects
    /// the application with a conflict if the stored value moved (a
    /// compare-and-set, the row-lock equivalent of `UPDATE .. WHERE
    /// amount = ?`).
    pub expected_remaining: Decimal,
}

/// One fill's persistent effects: an optional FightTrade (absent when the
/// fill only unwound pre-fight position) and an optional snapshot decrement.
#[derive(Debug, Clone)]
pub struct FillApplication {
    pub trade: Option<FightTrade>,
    pub prefight_draw: Option<PrefightDraw>,
}

/// Per-participant settlement results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantResult {
    pub user_id: UserId,
    pub final_score: Decimal,
    pub final_pnl_percent: Decimal,
}

/// Terminal outcome persisted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightFinalization {
    /// FINISHED or NO_CONTEST.
    pub status: FightStatus,
    pub winner: Option<UserId>,
    pub is_draw: bool,
    pub participant_results: Vec<ParticipantResult>,
}

/// Persistence intents of the settlement core.
#[async_trait]
pub trait FightStore: Send + Sync {
    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    async fn fight(&self, fight_id: FightId) -> StoreResult<Option<Fight>>;

    async fn participants(&self, fight_id: FightId) -> StoreResult<Vec<FightParticipant>>;

    /// Trades in ledger (insertion) order.
    async fn trades(&self, fight_id: FightId) -> StoreResult<Vec<FightTrade>>;

    async fn sessions(&self, fight_id: FightId) -> StoreResult<Vec<FightSession>>;

    async fn violations(&self, fight_id: FightId) -> StoreResult<Vec<AntiCheatViolation>>;

    /// Exchange order ids recorded for this fight and user.
    async fn fight_order_ids(&self, fight_id: FightId, user_id: UserId) -> StoreResult<Vec<String>>;

    /// Resolve the user's active LIVE fight: the specific one when a hint is
    /// given (and the user participates), else any LIVE fight of the user.
    async fn live_fight_for_user(
        &self,
        user_id: UserId,
        fight_id: Option<FightId>,
    ) -> StoreResult<Option<(Fight, FightParticipant)>>;

    /// LIVE fights whose scheduled end passed at least `grace` ago.
    async fn live_fights_past_end(
        &self,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> StoreResult<Vec<Fight>>;

    // ------------------------------------------------------------------
    // Pair history
    // ------------------------------------------------------------------

    /// Completed (FINISHED or NO_CONTEST) fights between the unordered pair
    /// created since `since`, excluding `exclude`.
    async fn completed_matchups_between(
        &self,
        a: UserId,
        b: UserId,
        since: DateTime<Utc>,
        exclude: FightId,
    ) -> StoreResult<u32>;

    /// As above but also counting LIVE fights and without an exclusion;
    /// used by the pre-matchmaking check.
    async fn matchups_between_including_live(
        &self,
        a: UserId,
        b: UserId,
        since: DateTime<Utc>,
    ) -> StoreResult<u32>;

    /// Other fights since `since` where both users have a session from one
    /// of `ips`.
    async fn shared_ip_matchups(
        &self,
        a: UserId,
        b: UserId,
        ips: &[IpAddr],
        since: DateTime<Utc>,
        exclude: FightId,
    ) -> StoreResult<u32>;

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    async fn append_session(&self, session: FightSession) -> StoreResult<()>;

    async fn append_order_action(&self, action: FightOrderAction) -> StoreResult<()>;

    async fn append_violation(&self, violation: AntiCheatViolation) -> StoreResult<()>;

    /// Apply one fill's effects atomically: append the trade (if any), bump
    /// the participant's trade count, and adjust the pre-fight snapshot
    /// (if any) under the snapshot compare-and-set.
    async fn apply_fill(
        &self,
        fight_id: FightId,
        user_id: UserId,
        application: FillApplication,
    ) -> StoreResult<()>;

    /// GREATEST-style conditional bump of the exposure high-water mark.
    /// Returns the stored value after the operation. Never decreases.
    async fn bump_max_exposure(
        &self,
        fight_id: FightId,
        user_id: UserId,
        candidate: Decimal,
    ) -> StoreResult<Decimal>;

    // ------------------------------------------------------------------
    // Settlement lock + finalize
    // ------------------------------------------------------------------

    /// Atomically check-and-stamp the settlement lock: requires status LIVE
    /// and no fresh lock (absent, or older than `ttl`). Implementations
    /// must serialize this check-and-stamp per fight row.
    async fn try_acquire_settlement_lock(
        &self,
        fight_id: FightId,
        process_id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> StoreResult<LockAttempt>;

    /// Clear the lock fields only if `settling_by` still equals
    /// `process_id`. Returns whether anything was released.
    async fn release_settlement_lock(
        &self,
        fight_id: FightId,
        process_id: &str,
    ) -> StoreResult<bool>;

    /// Persist the terminal status, winner/draw, and per-participant final
    /// scores. Fails with a conflict unless the fight is still LIVE.
    async fn finalize_fight(
        &self,
        fight_id: FightId,
        outcome: &FightFinalization,
    ) -> StoreResult<()>;
}
