//! Fight settlement for Trade Fight Club.
//!
//! A settlement run is: acquire the per-fight lock, gather the trade and
//! session evidence, score both sides, run anti-cheat adjudication, persist
//! the verdict and violations, release the lock. Two trigger paths drive
//! it, a realtime watcher and a trailing reconcile job; the store's row
//! lock is the only thing serializing them.

pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod outcome;
pub mod watcher;

pub use error::{SettlementError, SettlementResult};
pub use lock::{
    generate_process_id, is_lock_expired, settlement_lock_ttl, LockOutcome, SettlementLock,
    SettlementTrigger, SETTLEMENT_LOCK_TTL_SECS,
};
pub use orchestrator::SettlementOrchestrator;
pub use outcome::{
    outcome_channel, ParticipantScore, SettlementOutcome, OUTCOME_CHANNEL_CAPACITY,
};
pub use watcher::{SettlementWatcher, RECONCILE_GRACE_SECS};
