//! Anti-cheat violation audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ids::FightId;

/// Anti-cheat rule codes, stable wire/storage names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCode {
    ZeroZero,
    MinVolume,
    RepeatedMatchup,
    SameIpPattern,
    ExternalTrades,
}

impl RuleCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroZero => "ZERO_ZERO",
            Self::MinVolume => "MIN_VOLUME",
            Self::RepeatedMatchup => "REPEATED_MATCHUP",
            Self::SameIpPattern => "SAME_IP_PATTERN",
            Self::ExternalTrades => "EXTERNAL_TRADES",
        }
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action recorded against a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationAction {
    /// Violation excluded the fight from ranking.
    NoContest,
    /// Recorded for review, the fight still counts.
    Flagged,
    /// An admin restored the fight after review.
    Restored,
}

impl fmt::Display for ViolationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoContest => write!(f, "NO_CONTEST"),
            Self::Flagged => write!(f, "FLAGGED"),
            Self::Restored => write!(f, "RESTORED"),
        }
    }
}

/// One rule-failure record. Append-only; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiCheatViolation {
    pub id: Uuid,
    pub fight_id: FightId,
    pub rule_code: RuleCode,
    pub rule_name: String,
    pub message: String,
    /// Free-form rule evidence (user ids, counts, trade ids).
    pub metadata: serde_json::Value,
    pub action: ViolationAction,
    pub created_at: DateTime<Utc>,
}

impl AntiCheatViolation {
    pub fn new(
        fight_id: FightId,
        rule_code: RuleCode,
        rule_name: impl Into<String>,
        message: impl Into<String>,
        metadata: serde_json::Value,
        action: ViolationAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            fight_id,
            rule_code,
            rule_name: rule_name.into(),
            message: message.into(),
            metadata,
            action,
            created_at: Utc::now(),
        }
    }
}
