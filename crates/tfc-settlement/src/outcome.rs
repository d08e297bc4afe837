//! Settled-fight broadcast.
//!
//! The orchestrator publishes every settled fight on a broadcast channel.
//! Downstream consumers (realtime feed, admin audit views) subscribe; send
//! errors are ignored when nobody is connected.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

use tfc_core::{AntiCheatViolation, FightId, FightStatus, UserId};

/// Capacity of the outcome channel. Settlements are rare relative to reads;
/// a small buffer absorbs slow subscribers.
pub const OUTCOME_CHANNEL_CAPACITY: usize = 64;

/// One participant's final numbers.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantScore {
    pub user_id: UserId,
    /// Final USDC score (virtual equity minus stake).
    pub score_usdc: Decimal,
    /// Final PnL as a percentage of stake.
    pub pnl_percent: Decimal,
    /// Virtual equity at settlement.
    pub equity_virtual: Decimal,
}

/// One settled fight as published downstream.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub fight_id: FightId,
    /// FINISHED or NO_CONTEST.
    pub status: FightStatus,
    pub winner: Option<UserId>,
    pub is_draw: bool,
    /// Name of the adjudication rule that produced the outcome.
    pub decided_by: &'static str,
    pub scores: Vec<ParticipantScore>,
    /// Violations recorded this run.
    pub violations: Vec<AntiCheatViolation>,
    pub settled_at: DateTime<Utc>,
}

/// Create the outcome channel.
pub fn outcome_channel() -> (
    broadcast::Sender<SettlementOutcome>,
    broadcast::Receiver<SettlementOutcome>,
) {
    broadcast::channel(OUTCOME_CHANNEL_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outcome_channel_delivers_to_subscriber() {
        let (tx, _rx) = outcome_channel();
        let mut rx2 = tx.subscribe();

        let outcome = SettlementOutcome {
            fight_id: FightId::new(),
            status: FightStatus::Finished,
            winner: Some(UserId::new()),
            is_draw: false,
            decided_by: "score-outcome",
            scores: Vec::new(),
            violations: Vec::new(),
            settled_at: Utc::now(),
        };
        tx.send(outcome.clone()).unwrap();

        let received = rx2.recv().await.unwrap();
        assert_eq!(received.fight_id, outcome.fight_id);
        assert_eq!(received.status, FightStatus::Finished);
    }

    #[test]
    fn test_send_without_receivers_is_not_fatal() {
        let (tx, rx) = outcome_channel();
        drop(rx);

        let outcome = SettlementOutcome {
            fight_id: FightId::new(),
            status: FightStatus::NoContest,
            winner: None,
            is_draw: false,
            decided_by: "both-sides-cheated",
            scores: Vec::new(),
            violations: Vec::new(),
            settled_at: Utc::now(),
        };
        // No receivers: send reports an error the publisher ignores.
        assert!(tx.send(outcome).is_err());
    }
}
