//! Fight integrity rules and settlement adjudication.
//!
//! Every rule produces a [`rules::RuleOutcome`] instead of an error: a rule
//! failure is a fact about the fight, not a fault in the system. The
//! [`engine::AntiCheatEngine`] runs the full rule set against a fight and
//! aggregates the outcomes into a [`engine::FightValidation`];
//! [`adjudication::adjudicate`] then folds that verdict together with the
//! score-based result into the final settlement decision.

pub mod adjudication;
pub mod config;
pub mod engine;
pub mod error;
pub mod rules;

pub use adjudication::{adjudicate, AdjudicationInput, SettlementDecision};
pub use config::AntiCheatConfig;
pub use engine::{AntiCheatEngine, FightValidation};
pub use error::{AntiCheatError, AntiCheatResult};
pub use rules::{FightEvidence, RuleOutcome, SameIpFinding};
