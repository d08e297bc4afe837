//! Settlement lock acquisition and release.
//!
//! The store's check-and-stamp is the only mutual exclusion in the system;
//! this module wraps it with the fail-closed policy: any storage fault
//! during acquisition reads as "not acquired", so a flaky backend can never
//! let two processes settle the same fight.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use tfc_core::{FightId, FightStatus};
use tfc_store::{FightStore, LockAttempt};

/// Lock staleness window in seconds. Sized to exceed the slowest expected
/// settlement round-trip plus the reconcile job's 60-second grace, so a
/// crashed holder is reclaimed within one sweep.
pub const SETTLEMENT_LOCK_TTL_SECS: i64 = 300;

/// The staleness window as a duration.
pub fn settlement_lock_ttl() -> Duration {
    Duration::seconds(SETTLEMENT_LOCK_TTL_SECS)
}

/// True when a stamped lock is older than the staleness window.
pub fn is_lock_expired(settling_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - settling_at > settlement_lock_ttl()
}

/// Which path asked for settlement. Each trigger runs as its own process;
/// the lock token prefix keeps them apart in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementTrigger {
    /// Event-driven: the fight's scheduled end just passed.
    Realtime,
    /// Periodic sweep over LIVE fights past end plus grace.
    Reconcile,
}

impl SettlementTrigger {
    /// Prefix of the lock token.
    pub fn process_prefix(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Reconcile => "job-reconcile",
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Reconcile => "reconcile",
        }
    }
}

/// Build a human-traceable lock token: `<prefix>-<instance>` when the
/// deployment configures an instance id, else `<prefix>-<uuid>`.
pub fn generate_process_id(trigger: SettlementTrigger, instance: Option<&str>) -> String {
    match instance {
        Some(id) => format!("{}-{id}", trigger.process_prefix()),
        None => format!("{}-{}", trigger.process_prefix(), Uuid::new_v4()),
    }
}

/// Outcome of one acquisition attempt as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum LockOutcome {
    Acquired,
    /// Another process holds a fresh lock.
    Held { by: String, since: DateTime<Utc> },
    /// The fight already left LIVE; nothing to settle.
    NotLive { status: FightStatus },
    NotFound,
    /// The store faulted mid-check; treated as not acquired.
    Uncertain,
}

impl LockOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

impl From<LockAttempt> for LockOutcome {
    fn from(attempt: LockAttempt) -> Self {
        match attempt {
            LockAttempt::Acquired => Self::Acquired,
            LockAttempt::Held { by, since } => Self::Held { by, since },
            LockAttempt::NotLive { status } => Self::NotLive { status },
            LockAttempt::NotFound => Self::NotFound,
        }
    }
}

/// Fail-closed facade over the store's lock methods.
pub struct SettlementLock {
    store: Arc<dyn FightStore>,
}

impl SettlementLock {
    pub fn new(store: Arc<dyn FightStore>) -> Self {
        Self { store }
    }

    /// Try to stamp the lock. A store error is swallowed into
    /// [`LockOutcome::Uncertain`]: with lock state unknown, proceeding
    /// could double-settle, so the caller skips and the reconcile sweep
    /// retries once the store recovers.
    pub async fn acquire(&self, fight_id: FightId, process_id: &str) -> LockOutcome {
        match self
            .store
            .try_acquire_settlement_lock(fight_id, process_id, Utc::now(), settlement_lock_ttl())
            .await
        {
            Ok(attempt) => attempt.into(),
            Err(e) => {
                warn!(%fight_id, process_id, error = %e, "Lock acquisition failed, treating as not acquired");
                LockOutcome::Uncertain
            }
        }
    }

    /// Release the lock if we still hold it. Errors are logged and reported
    /// as not released; the staleness window reclaims the row either way.
    pub async fn release(&self, fight_id: FightId, process_id: &str) -> bool {
        match self.store.release_settlement_lock(fight_id, process_id).await {
            Ok(released) => released,
            Err(e) => {
                warn!(%fight_id, process_id, error = %e, "Lock release failed, timeout will reclaim");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::net::IpAddr;
    use tfc_core::{
        AntiCheatViolation, Fight, FightOrderAction, FightParticipant, FightSession, FightTrade,
        UserId,
    };
    use tfc_store::{FightFinalization, FillApplication, MemoryStore, StoreError, StoreResult};

    #[test]
    fn test_process_id_prefixes() {
        let realtime = generate_process_id(SettlementTrigger::Realtime, None);
        assert!(realtime.starts_with("realtime-"));

        let reconcile = generate_process_id(SettlementTrigger::Reconcile, None);
        assert!(reconcile.starts_with("job-reconcile-"));

        let pinned = generate_process_id(SettlementTrigger::Reconcile, Some("pod-3"));
        assert_eq!(pinned, "job-reconcile-pod-3");
    }

    #[test]
    fn test_lock_expiry_is_strict() {
        let now = Utc::now();
        assert!(!is_lock_expired(now - Duration::seconds(10), now));
        assert!(!is_lock_expired(now - settlement_lock_ttl(), now));
        assert!(is_lock_expired(
            now - settlement_lock_ttl() - Duration::seconds(1),
            now
        ));
    }

    fn seed_live_fight(store: &MemoryStore) -> FightId {
        let mut fight = Fight::new(UserId::new(), 15, dec!(100)).unwrap();
        fight.start(Utc::now() - Duration::minutes(20)).unwrap();
        let fight_id = fight.id;
        store.insert_fight(fight);
        fight_id
    }

    #[tokio::test]
    async fn test_acquire_then_held_then_release() {
        let store = Arc::new(MemoryStore::new());
        let fight_id = seed_live_fight(&store);
        let lock = SettlementLock::new(store);

        assert!(lock.acquire(fight_id, "realtime-a").await.is_acquired());
        match lock.acquire(fight_id, "job-reconcile-b").await {
            LockOutcome::Held { by, .. } => assert_eq!(by, "realtime-a"),
            other => panic!("expected Held, got {other:?}"),
        }

        // Wrong token releases nothing, the holder's token does.
        assert!(!lock.release(fight_id, "job-reconcile-b").await);
        assert!(lock.release(fight_id, "realtime-a").await);
        assert!(lock.acquire(fight_id, "job-reconcile-b").await.is_acquired());
    }

    /// Store stub whose lock methods always fault.
    struct BrokenStore;

    #[async_trait]
    impl tfc_store::FightStore for BrokenStore {
        async fn fight(&self, _: FightId) -> StoreResult<Option<Fight>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn participants(&self, _: FightId) -> StoreResult<Vec<FightParticipant>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn trades(&self, _: FightId) -> StoreResult<Vec<FightTrade>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn sessions(&self, _: FightId) -> StoreResult<Vec<FightSession>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn violations(&self, _: FightId) -> StoreResult<Vec<AntiCheatViolation>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn fight_order_ids(&self, _: FightId, _: UserId) -> StoreResult<Vec<String>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn live_fight_for_user(
            &self,
            _: UserId,
            _: Option<FightId>,
        ) -> StoreResult<Option<(Fight, FightParticipant)>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn live_fights_past_end(
            &self,
            _: DateTime<Utc>,
            _: Duration,
        ) -> StoreResult<Vec<Fight>> {
            Err(StoreError::Backend("down".into()))
        }
        async fn completed_matchups_between(
            &self,
            _: UserId,
            _: UserId,
            _: DateTime<Utc>,
            _: FightId,
        ) -> StoreResult<u32> {
            Err(StoreError::Backend("down".into()))
        }
        async fn matchups_between_including_live(
            &self,
            _: UserId,
            _: UserId,
            _: DateTime<Utc>,
        ) -> StoreResult<u32> {
            Err(StoreError::Backend("down".into()))
        }
        async fn shared_ip_matchups(
            &self,
            _: UserId,
            _: UserId,
            _: &[IpAddr],
            _: DateTime<Utc>,
            _: FightId,
        ) -> StoreResult<u32> {
            Err(StoreError::Backend("down".into()))
        }
        async fn append_session(&self, _: FightSession) -> StoreResult<()> {
            Err(StoreError::Backend("down".into()))
        }
        async fn append_order_action(&self, _: FightOrderAction) -> StoreResult<()> {
            Err(StoreError::Backend("down".into()))
        }
        async fn append_violation(&self, _: AntiCheatViolation) -> StoreResult<()> {
            Err(StoreError::Backend("down".into()))
        }
        async fn apply_fill(
            &self,
            _: FightId,
            _: UserId,
            _: FillApplication,
        ) -> StoreResult<()> {
            Err(StoreError::Backend("down".into()))
        }
        async fn bump_max_exposure(
            &self,
            _: FightId,
            _: UserId,
            _: Decimal,
        ) -> StoreResult<Decimal> {
            Err(StoreError::Backend("down".into()))
        }
        async fn try_acquire_settlement_lock(
            &self,
            _: FightId,
            _: &str,
            _: DateTime<Utc>,
            _: Duration,
        ) -> StoreResult<LockAttempt> {
            Err(StoreError::Backend("down".into()))
        }
        async fn release_settlement_lock(&self, _: FightId, _: &str) -> StoreResult<bool> {
            Err(StoreError::Backend("down".into()))
        }
        async fn finalize_fight(&self, _: FightId, _: &FightFinalization) -> StoreResult<()> {
            Err(StoreError::Backend("down".into()))
        }
    }

    #[tokio::test]
    async fn test_store_fault_reads_as_not_acquired() {
        let lock = SettlementLock::new(Arc::new(BrokenStore));
        let fight_id = FightId::new();

        let outcome = lock.acquire(fight_id, "realtime-x").await;
        assert_eq!(outcome, LockOutcome::Uncertain);
        assert!(!outcome.is_acquired());
        assert!(!lock.release(fight_id, "realtime-x").await);
    }

    #[tokio::test]
    async fn test_not_live_and_not_found() {
        let store = Arc::new(MemoryStore::new());
        let fight = Fight::new(UserId::new(), 5, dec!(50)).unwrap();
        let waiting_id = fight.id;
        store.insert_fight(fight);
        let lock = SettlementLock::new(store);

        match lock.acquire(waiting_id, "realtime-x").await {
            LockOutcome::NotLive { status } => {
                assert_eq!(status, FightStatus::Waiting)
            }
            other => panic!("expected NotLive, got {other:?}"),
        }
        assert_eq!(
            lock.acquire(FightId::new(), "realtime-x").await,
            LockOutcome::NotFound
        );
    }
}
