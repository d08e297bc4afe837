//! In-memory `FightStore` implementation.
//!
//! Each fight's full row set (fight, participants, trades, sessions, order
//! actions, violations) lives behind one `Arc<Mutex<..>>`. The per-row
//! mutex serializes every check-and-stamp, which gives the same mutual
//! exclusion a relational backend gets from `SELECT ... FOR UPDATE`.
//! Different fights never contend.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use tfc_core::{
    AntiCheatViolation, Fight, FightOrderAction, FightParticipant, FightSession, FightStatus,
    FightTrade, FightId, UserId,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{FightFinalization, FightStore, FillApplication, LockAttempt};

#[derive(Debug, Default)]
struct FightRow {
    fight: Option<Fight>,
    participants: Vec<FightParticipant>,
    trades: Vec<FightTrade>,
    sessions: Vec<FightSession>,
    order_actions: Vec<FightOrderAction>,
    violations: Vec<AntiCheatViolation>,
}

type SharedRow = Arc<Mutex<FightRow>>;

/// In-memory fight store. Suitable for tests and the demo engine.
#[derive(Default)]
pub struct MemoryStore {
    rows: DashMap<FightId, SharedRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, fight_id: FightId) -> StoreResult<SharedRow> {
        self.rows
            .get(&fight_id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::FightNotFound(fight_id))
    }

    fn row_or_create(&self, fight_id: FightId) -> SharedRow {
        self.rows
            .entry(fight_id)
            .or_insert_with(|| Arc::new(Mutex::new(FightRow::default())))
            .value()
            .clone()
    }

    fn all_rows(&self) -> Vec<(FightId, SharedRow)> {
        self.rows
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Seeding (upstream CRUD stands in for fight creation/join)
    // ------------------------------------------------------------------

    pub fn insert_fight(&self, fight: Fight) {
        let row = self.row_or_create(fight.id);
        row.lock().fight = Some(fight);
    }

    pub fn insert_participant(&self, participant: FightParticipant) -> StoreResult<()> {
        let row = self.row(participant.fight_id)?;
        row.lock().participants.push(participant);
        Ok(())
    }
}

#[async_trait]
impl FightStore for MemoryStore {
    async fn fight(&self, fight_id: FightId) -> StoreResult<Option<Fight>> {
        match self.rows.get(&fight_id) {
            Some(row) => Ok(row.value().lock().fight.clone()),
            None => Ok(None),
        }
    }

    async fn participants(&self, fight_id: FightId) -> StoreResult<Vec<FightParticipant>> {
        Ok(self.row(fight_id)?.lock().participants.clone())
    }

    async fn trades(&self, fight_id: FightId) -> StoreResult<Vec<FightTrade>> {
        Ok(self.row(fight_id)?.lock().trades.clone())
    }

    async fn sessions(&self, fight_id: FightId) -> StoreResult<Vec<FightSession>> {
        Ok(self.row(fight_id)?.lock().sessions.clone())
    }

    async fn violations(&self, fight_id: FightId) -> StoreResult<Vec<AntiCheatViolation>> {
        Ok(self.row(fight_id)?.lock().violations.clone())
    }

    async fn fight_order_ids(&self, fight_id: FightId, user_id: UserId) -> StoreResult<Vec<String>> {
        Ok(self
            .row(fight_id)?
            .lock()
            .order_actions
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.exchange_order_id.clone())
            .collect())
    }

    async fn live_fight_for_user(
        &self,
        user_id: UserId,
        fight_id: Option<FightId>,
    ) -> StoreResult<Option<(Fight, FightParticipant)>> {
        let candidates = match fight_id {
            Some(id) => match self.rows.get(&id) {
                Some(row) => vec![(id, row.value().clone())],
                None => return Ok(None),
            },
            None => self.all_rows(),
        };

        for (_, row) in candidates {
            let guard = row.lock();
            let Some(fight) = guard.fight.as_ref() else {
                continue;
            };
            if !fight.status.is_live() {
                continue;
            }
            if let Some(p) = guard.participants.iter().find(|p| p.user_id == user_id) {
                return Ok(Some((fight.clone(), p.clone())));
            }
        }
        Ok(None)
    }

    async fn live_fights_past_end(
        &self,
        now: DateTime<Utc>,
        grace: Duration,
    ) -> StoreResult<Vec<Fight>> {
        let mut due = Vec::new();
        for (_, row) in self.all_rows() {
            let guard = row.lock();
            if let Some(fight) = guard.fight.as_ref() {
                if fight.status.is_live() && fight.is_past_end(now, grace) {
                    due.push(fight.clone());
                }
            }
        }
        Ok(due)
    }

    async fn completed_matchups_between(
        &self,
        a: UserId,
        b: UserId,
        since: DateTime<Utc>,
        exclude: FightId,
    ) -> StoreResult<u32> {
        let mut count = 0;
        for (id, row) in self.all_rows() {
            if id == exclude {
                continue;
            }
            let guard = row.lock();
            let Some(fight) = guard.fight.as_ref() else {
                continue;
            };
            if !matches!(fight.status, FightStatus::Finished | FightStatus::NoContest)
                || fight.created_at < since
            {
                continue;
            }
            if pair_matches(&guard.participants, a, b) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn matchups_between_including_live(
        &self,
        a: UserId,
        b: UserId,
        since: DateTime<Utc>,
    ) -> StoreResult<u32> {
        let mut count = 0;
        for (_, row) in self.all_rows() {
            let guard = row.lock();
            let Some(fight) = guard.fight.as_ref() else {
                continue;
            };
            let counted = matches!(
                fight.status,
                FightStatus::Live | FightStatus::Finished | FightStatus::NoContest
            );
            if !counted || fight.created_at < since {
                continue;
            }
            if pair_matches(&guard.participants, a, b) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn shared_ip_matchups(
        &self,
        a: UserId,
        b: UserId,
        ips: &[IpAddr],
        since: DateTime<Utc>,
        exclude: FightId,
    ) -> StoreResult<u32> {
        let mut count = 0;
        for (id, row) in self.all_rows() {
            if id == exclude {
                continue;
            }
            let guard = row.lock();
            let Some(fight) = guard.fight.as_ref() else {
                continue;
            };
            if fight.created_at < since {
                continue;
            }
            let user_hit = |user: UserId| {
                guard
                    .sessions
                    .iter()
                    .any(|s| s.user_id == user && ips.contains(&s.ip))
            };
            if user_hit(a) && user_hit(b) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn append_session(&self, session: FightSession) -> StoreResult<()> {
        let row = self.row(session.fight_id)?;
        row.lock().sessions.push(session);
        Ok(())
    }

    async fn append_order_action(&self, action: FightOrderAction) -> StoreResult<()> {
        let row = self.row(action.fight_id)?;
        row.lock().order_actions.push(action);
        Ok(())
    }

    async fn append_violation(&self, violation: AntiCheatViolation) -> StoreResult<()> {
        let row = self.row(violation.fight_id)?;
        row.lock().violations.push(violation);
        Ok(())
    }

    async fn apply_fill(
        &self,
        fight_id: FightId,
        user_id: UserId,
        application: FillApplication,
    ) -> StoreResult<()> {
        let row = self.row(fight_id)?;
        let mut guard = row.lock();

        let idx = guard
            .participants
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or(StoreError::ParticipantNotFound { fight_id, user_id })?;

        if let Some(draw) = &application.prefight_draw {
            let participant = &mut guard.participants[idx];
            let current = participant.remaining_prefight(&draw.symbol);
            if current != draw.expected_remaining {
                return Err(StoreError::Conflict(format!(
                    "pre-fight snapshot moved for {}: expected {}, found {}",
                    draw.symbol, draw.expected_remaining, current
                )));
            }
            match participant
                .initial_positions
                .iter_mut()
                .find(|p| p.symbol == draw.symbol)
            {
                Some(entry) => entry.amount += draw.delta,
                None if draw.delta.is_zero() => {}
                None => {
                    return Err(StoreError::Conflict(format!(
                        "no pre-fight position in {} to draw from",
                        draw.symbol
                    )))
                }
            }
        }

        if let Some(trade) = application.trade {
            guard.trades.push(trade);
            guard.participants[idx].trades_count += 1;
        }
        Ok(())
    }

    async fn bump_max_exposure(
        &self,
        fight_id: FightId,
        user_id: UserId,
        candidate: Decimal,
    ) -> StoreResult<Decimal> {
        let row = self.row(fight_id)?;
        let mut guard = row.lock();
        let participant = guard
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(StoreError::ParticipantNotFound { fight_id, user_id })?;

        participant.max_exposure_used = participant.max_exposure_used.max(candidate);
        Ok(participant.max_exposure_used)
    }

    async fn try_acquire_settlement_lock(
        &self,
        fight_id: FightId,
        process_id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> StoreResult<LockAttempt> {
        let row = match self.rows.get(&fight_id) {
            Some(row) => row.value().clone(),
            None => return Ok(LockAttempt::NotFound),
        };
        let mut guard = row.lock();
        let Some(fight) = guard.fight.as_mut() else {
            return Ok(LockAttempt::NotFound);
        };

        if !fight.status.is_live() {
            return Ok(LockAttempt::NotLive {
                status: fight.status,
            });
        }

        if let (Some(at), Some(by)) = (fight.settling_at, fight.settling_by.as_ref()) {
            if now - at <= ttl {
                return Ok(LockAttempt::Held {
                    by: by.clone(),
                    since: at,
                });
            }
            debug!(%fight_id, stale_holder = %by, "Settlement lock expired, taking over");
        }

        fight.settling_at = Some(now);
        fight.settling_by = Some(process_id.to_string());
        Ok(LockAttempt::Acquired)
    }

    async fn release_settlement_lock(
        &self,
        fight_id: FightId,
        process_id: &str,
    ) -> StoreResult<bool> {
        let row = self.row(fight_id)?;
        let mut guard = row.lock();
        let Some(fight) = guard.fight.as_mut() else {
            return Ok(false);
        };

        if fight.settling_by.as_deref() == Some(process_id) {
            fight.settling_at = None;
            fight.settling_by = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn finalize_fight(
        &self,
        fight_id: FightId,
        outcome: &FightFinalization,
    ) -> StoreResult<()> {
        let row = self.row(fight_id)?;
        let mut guard = row.lock();
        let Some(fight) = guard.fight.as_mut() else {
            return Err(StoreError::FightNotFound(fight_id));
        };

        if !fight.status.can_transition_to(outcome.status) {
            return Err(StoreError::Conflict(format!(
                "cannot finalize fight in status {} to {}",
                fight.status, outcome.status
            )));
        }

        fight.status = outcome.status;
        fight.winner = outcome.winner;
        fight.is_draw = outcome.is_draw;

        for result in &outcome.participant_results {
            if let Some(p) = guard
                .participants
                .iter_mut()
                .find(|p| p.user_id == result.user_id)
            {
                p.final_score = Some(result.final_score);
                p.final_pnl_percent = Some(result.final_pnl_percent);
            }
        }
        Ok(())
    }
}

fn pair_matches(participants: &[FightParticipant], a: UserId, b: UserId) -> bool {
    let has = |u: UserId| participants.iter().any(|p| p.user_id == u);
    has(a) && has(b)
}
