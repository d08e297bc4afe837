//! Session evidence records for anti-cheat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::ids::{FightId, UserId};

/// What the user was doing when the session row was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Join,
    Trade,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join => write!(f, "join"),
            Self::Trade => write!(f, "trade"),
        }
    }
}

/// Append-only (fight, user, IP, user agent) evidence tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightSession {
    pub fight_id: FightId,
    pub user_id: UserId,
    pub ip: IpAddr,
    pub user_agent: String,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
}

impl FightSession {
    pub fn new(
        fight_id: FightId,
        user_id: UserId,
        ip: IpAddr,
        user_agent: impl Into<String>,
        kind: SessionKind,
    ) -> Self {
        Self {
            fight_id,
            user_id,
            ip,
            user_agent: user_agent.into(),
            kind,
            created_at: Utc::now(),
        }
    }
}
