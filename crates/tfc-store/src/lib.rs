//! Persistence boundary for fight settlement.
//!
//! The [`FightStore`] trait is the only way settlement, stake validation,
//! and anti-cheat touch fight state. Backends stay dumb: every atomic
//! contract (settlement lock stamping, pre-fight snapshot compare-and-set,
//! exposure high-water marks) is part of the trait semantics, so the
//! decision logic above it stays backend-agnostic.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{
    FightFinalization, FightStore, FillApplication, LockAttempt, ParticipantResult, PrefightDraw,
};
