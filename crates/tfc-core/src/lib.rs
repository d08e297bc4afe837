//! Core domain types for the Trade Fight Club settlement core.
//!
//! This crate provides fundamental types used throughout the pipeline:
//! - `FightId`, `UserId`, `AccountId`, `Symbol`: identifier newtypes
//! - `Price`, `Amount`: precision-safe numeric types
//! - `Fight`, `FightParticipant`, `FightTrade`, `FightSession`: fight records
//! - `AntiCheatViolation`, `RuleCode`: audit types

pub mod decimal;
pub mod error;
pub mod fight;
pub mod ids;
pub mod session;
pub mod side;
pub mod trade;
pub mod violation;

pub use decimal::{Amount, Price};
pub use error::{CoreError, CoreResult};
pub use fight::{
    Fight, FightParticipant, FightSlot, FightStatus, InitialPosition, ALLOWED_DURATIONS_MIN,
    ALLOWED_STAKES_USDC,
};
pub use ids::{AccountId, FightId, Symbol, UserId};
pub use session::{FightSession, SessionKind};
pub use side::{OrderKind, Side};
pub use trade::{FightOrderAction, FightTrade};
pub use violation::{AntiCheatViolation, RuleCode, ViolationAction};
