//! Settlement orchestration.
//!
//! One entry point per fight: acquire the lock, gather the evidence, score
//! both sides, adjudicate, persist, release. Release happens on every path
//! after acquisition; an error mid-run leaves the fight LIVE and unlocked
//! for the reconcile sweep to retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use tfc_anticheat::{
    adjudicate, AdjudicationInput, AntiCheatEngine, FightEvidence, FightValidation,
};
use tfc_core::{
    AntiCheatViolation, Fight, FightId, FightParticipant, FightStatus, FightTrade, UserId,
    ViolationAction,
};
use tfc_exchange::ExchangeClient;
use tfc_exposure::{open_positions, positions_from_trades, OpenPosition};
use tfc_scoring::{calculate_score, determine_winner, ScoreBreakdown, ScoreInput};
use tfc_store::{FightFinalization, FightStore, ParticipantResult};
use tfc_telemetry::Metrics;

use crate::error::{SettlementError, SettlementResult};
use crate::lock::{generate_process_id, LockOutcome, SettlementLock, SettlementTrigger};
use crate::outcome::{outcome_channel, ParticipantScore, SettlementOutcome};

/// Runs settlements. One instance per process; safe to share across the
/// realtime and reconcile tasks of that process because every fight is
/// serialized through the store lock anyway.
pub struct SettlementOrchestrator {
    store: Arc<dyn FightStore>,
    exchange: Arc<dyn ExchangeClient>,
    anticheat: Arc<AntiCheatEngine>,
    lock: SettlementLock,
    outcomes: broadcast::Sender<SettlementOutcome>,
    /// Stable instance id for lock tokens, when the deployment sets one.
    instance_id: Option<String>,
}

impl SettlementOrchestrator {
    pub fn new(
        store: Arc<dyn FightStore>,
        exchange: Arc<dyn ExchangeClient>,
        anticheat: Arc<AntiCheatEngine>,
    ) -> Self {
        let (outcomes, _) = outcome_channel();
        Self {
            lock: SettlementLock::new(Arc::clone(&store)),
            store,
            exchange,
            anticheat,
            outcomes,
            instance_id: None,
        }
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Subscribe to settled outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementOutcome> {
        self.outcomes.subscribe()
    }

    /// Settle one fight end to end.
    ///
    /// Returns `Ok(None)` when this process should not settle right now:
    /// the lock is held elsewhere, the fight already left LIVE, or lock
    /// state could not be determined. Errors mean the run started and
    /// failed; the lock is released first so a later attempt can retry.
    pub async fn settle_fight(
        &self,
        fight_id: FightId,
        trigger: SettlementTrigger,
    ) -> SettlementResult<Option<SettlementOutcome>> {
        let process_id = generate_process_id(trigger, self.instance_id.as_deref());
        let started = Instant::now();

        match self.lock.acquire(fight_id, &process_id).await {
            LockOutcome::Acquired => {}
            LockOutcome::Held { by, since } => {
                Metrics::lock_contended(trigger.label());
                info!(%fight_id, held_by = %by, %since, "Settlement lock held elsewhere, skipping");
                return Ok(None);
            }
            LockOutcome::NotLive { status } => {
                debug!(%fight_id, %status, "Fight no longer LIVE, nothing to settle");
                return Ok(None);
            }
            LockOutcome::NotFound => {
                warn!(%fight_id, "Fight not found at settlement time");
                return Ok(None);
            }
            // acquire() already logged the storage fault.
            LockOutcome::Uncertain => return Ok(None),
        }

        let result = self.settle_locked(fight_id).await;
        self.lock.release(fight_id, &process_id).await;
        Metrics::settlement_duration(trigger.label(), started.elapsed().as_secs_f64());

        match result {
            Ok(outcome) => {
                let status_label = match outcome.status {
                    FightStatus::NoContest => "no_contest",
                    _ => "finished",
                };
                Metrics::settlement_completed(status_label, trigger.label());
                info!(
                    %fight_id,
                    status = %outcome.status,
                    winner = ?outcome.winner,
                    is_draw = outcome.is_draw,
                    decided_by = outcome.decided_by,
                    violations = outcome.violations.len(),
                    "Fight settled"
                );
                let _ = self.outcomes.send(outcome.clone());
                Ok(Some(outcome))
            }
            Err(e) => {
                error!(%fight_id, error = %e, "Settlement failed, lock released for retry");
                Err(e)
            }
        }
    }

    /// The settlement body, run strictly under the lock.
    async fn settle_locked(&self, fight_id: FightId) -> SettlementResult<SettlementOutcome> {
        let fight = self
            .store
            .fight(fight_id)
            .await?
            .ok_or(SettlementError::MissingFight(fight_id))?;
        let participants = self.store.participants(fight_id).await?;
        let [a, b] = participants.as_slice() else {
            return Err(SettlementError::MalformedFight {
                fight_id,
                count: participants.len(),
            });
        };
        let trades = self.store.trades(fight_id).await?;
        let sessions = self.store.sessions(fight_id).await?;

        let score_a = self.score_participant(&fight, a, &trades).await?;
        let score_b = self.score_participant(&fight, b, &trades).await?;
        let scored =
            determine_winner(a.user_id, score_a.score_usdc, b.user_id, score_b.score_usdc);

        let scores: HashMap<_, _> = [
            (a.user_id, score_a.score_usdc),
            (b.user_id, score_b.score_usdc),
        ]
        .into();
        let evidence = FightEvidence {
            fight: &fight,
            participants: &participants,
            trades: &trades,
            sessions: &sessions,
            scores: &scores,
        };
        let validation = self
            .anticheat
            .validate_fight_for_settlement(&evidence)
            .await?;

        let decision = adjudicate(&AdjudicationInput {
            fight_id,
            participants: (a.user_id, b.user_id),
            validation: &validation,
            scored_winner: scored.winner,
            scored_is_draw: scored.is_draw,
        });

        let violations = self
            .persist_violations(fight_id, &validation, decision.status)
            .await?;

        let finalization = FightFinalization {
            status: decision.status,
            winner: decision.winner,
            is_draw: decision.is_draw,
            participant_results: vec![
                ParticipantResult {
                    user_id: a.user_id,
                    final_score: score_a.score_usdc,
                    final_pnl_percent: score_a.pnl_percent,
                },
                ParticipantResult {
                    user_id: b.user_id,
                    final_score: score_b.score_usdc,
                    final_pnl_percent: score_b.pnl_percent,
                },
            ],
        };
        self.store.finalize_fight(fight_id, &finalization).await?;

        Ok(SettlementOutcome {
            fight_id,
            status: decision.status,
            winner: decision.winner,
            is_draw: decision.is_draw,
            decided_by: decision.decided_by,
            scores: vec![
                participant_score(a.user_id, &score_a),
                participant_score(b.user_id, &score_b),
            ],
            violations,
            settled_at: Utc::now(),
        })
    }

    /// Score one side. Realized PnL and fees come from the trade ledger;
    /// when fight positions are still open, unrealized PnL and funding come
    /// from the venue.
    async fn score_participant(
        &self,
        fight: &Fight,
        participant: &FightParticipant,
        trades: &[FightTrade],
    ) -> SettlementResult<ScoreBreakdown> {
        let own: Vec<FightTrade> = trades
            .iter()
            .filter(|t| t.user_id == participant.user_id)
            .cloned()
            .collect();
        let realized_pnl: Decimal = own.iter().map(|t| t.realized_pnl).sum();
        let fees: Decimal = own.iter().map(|t| t.fee).sum();

        let book = positions_from_trades(&own);
        let open = open_positions(&book);
        let (unrealized_pnl, funding) = if open.is_empty() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            self.venue_unrealized(participant, &open).await?
        };

        Ok(calculate_score(&ScoreInput {
            stake: fight.stake,
            realized_pnl,
            unrealized_pnl,
            fees,
            funding,
        })?)
    }

    /// Venue unrealized PnL and funding summed over the open fight symbols.
    ///
    /// Unlike the stake validator's fail-open reconciliation, errors here
    /// propagate: a score without these numbers would be wrong, and the
    /// reconcile sweep retries once the venue recovers.
    async fn venue_unrealized(
        &self,
        participant: &FightParticipant,
        open: &[OpenPosition],
    ) -> SettlementResult<(Decimal, Decimal)> {
        let live = self.exchange.open_positions(&participant.account).await?;
        let mut unrealized = Decimal::ZERO;
        let mut funding = Decimal::ZERO;
        for position in live {
            if open.iter().any(|o| o.symbol == position.symbol) {
                unrealized += position.unrealized_pnl;
                funding += position.funding_since_open;
            }
        }
        Ok((unrealized, funding))
    }

    /// Persist rule failures and warnings as audit records.
    ///
    /// Violations carry NO_CONTEST when the adjudicated status voided the
    /// fight, FLAGGED when it still counts (the disqualify-cheater case).
    /// Warnings are always FLAGGED.
    async fn persist_violations(
        &self,
        fight_id: FightId,
        validation: &FightValidation,
        final_status: FightStatus,
    ) -> SettlementResult<Vec<AntiCheatViolation>> {
        let action = if final_status == FightStatus::NoContest {
            ViolationAction::NoContest
        } else {
            ViolationAction::Flagged
        };

        let mut records =
            Vec::with_capacity(validation.violations.len() + validation.warnings.len());
        for outcome in &validation.violations {
            records.push(AntiCheatViolation::new(
                fight_id,
                outcome.rule_code,
                outcome.rule_name,
                outcome.message.clone(),
                outcome.metadata.clone(),
                action,
            ));
        }
        for outcome in &validation.warnings {
            records.push(AntiCheatViolation::new(
                fight_id,
                outcome.rule_code,
                outcome.rule_name,
                outcome.message.clone(),
                outcome.metadata.clone(),
                ViolationAction::Flagged,
            ));
        }

        for record in &records {
            self.store.append_violation(record.clone()).await?;
            Metrics::violation_recorded(record.rule_code.as_str());
        }
        Ok(records)
    }
}

fn participant_score(user_id: UserId, breakdown: &ScoreBreakdown) -> ParticipantScore {
    ParticipantScore {
        user_id,
        score_usdc: breakdown.score_usdc,
        pnl_percent: breakdown.pnl_percent,
        equity_virtual: breakdown.equity_virtual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tfc_anticheat::AntiCheatConfig;
    use tfc_core::{
        AccountId, Amount, Fight, FightSlot, Price, RuleCode, Side, Symbol,
    };
    use tfc_exchange::{AccountPosition, ExchangeError, ExchangeResult, OpenOrder};
    use tfc_store::{FillApplication, MemoryStore};

    use crate::lock::settlement_lock_ttl;

    struct StubExchange {
        positions: Vec<AccountPosition>,
        down: bool,
    }

    impl StubExchange {
        fn quiet() -> Self {
            Self {
                positions: Vec::new(),
                down: false,
            }
        }
    }

    #[async_trait]
    impl ExchangeClient for StubExchange {
        async fn mark_price(&self, _symbol: &Symbol) -> ExchangeResult<Price> {
            Ok(Price::new(dec!(50000)))
        }

        async fn open_positions(
            &self,
            _account: &AccountId,
        ) -> ExchangeResult<Vec<AccountPosition>> {
            if self.down {
                return Err(ExchangeError::HttpClient("info endpoint down".to_string()));
            }
            Ok(self.positions.clone())
        }

        async fn open_orders(&self, _account: &AccountId) -> ExchangeResult<Vec<OpenOrder>> {
            Ok(Vec::new())
        }
    }

    fn orchestrator(store: &Arc<MemoryStore>, exchange: StubExchange) -> SettlementOrchestrator {
        let anticheat = Arc::new(AntiCheatEngine::new(
            store.clone(),
            AntiCheatConfig::default(),
        ));
        SettlementOrchestrator::new(store.clone(), Arc::new(exchange), anticheat)
    }

    /// LIVE fight whose window ended five minutes ago, both seats filled.
    fn seed_ended_fight(store: &MemoryStore) -> (FightId, UserId, UserId) {
        let a = UserId::new();
        let b = UserId::new();
        let mut fight = Fight::new(a, 15, dec!(100)).unwrap();
        fight.start(Utc::now() - Duration::minutes(20)).unwrap();
        let fight_id = fight.id;
        store.insert_fight(fight);
        for (user, account, slot) in [(a, "0xaaa", FightSlot::A), (b, "0xbbb", FightSlot::B)] {
            store
                .insert_participant(FightParticipant::new(
                    fight_id,
                    user,
                    AccountId::from(account),
                    slot,
                ))
                .unwrap();
        }
        (fight_id, a, b)
    }

    /// BUY then SELL 0.01 BTC at 50k, realized PnL on the close. Clears the
    /// minimum-volume rule and leaves the book flat.
    async fn seed_round_trip(
        store: &MemoryStore,
        fight_id: FightId,
        user: UserId,
        pnl: Decimal,
    ) {
        let base = Utc::now() - Duration::minutes(10);
        let open = FightTrade::new(
            fight_id,
            user,
            Symbol::from("BTC"),
            Side::Buy,
            Amount::new(dec!(0.01)),
            Price::new(dec!(50000)),
            base,
        );
        let close = FightTrade::new(
            fight_id,
            user,
            Symbol::from("BTC"),
            Side::Sell,
            Amount::new(dec!(0.01)),
            Price::new(dec!(50000)),
            base + Duration::seconds(30),
        )
        .with_realized_pnl(pnl);
        for trade in [open, close] {
            store
                .apply_fill(
                    fight_id,
                    user,
                    FillApplication {
                        trade: Some(trade),
                        prefight_draw: None,
                    },
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_clean_fight_settles_on_score() {
        let store = Arc::new(MemoryStore::new());
        let (fight_id, a, b) = seed_ended_fight(&store);
        seed_round_trip(&store, fight_id, a, dec!(5)).await;
        seed_round_trip(&store, fight_id, b, dec!(-3)).await;

        let orch = orchestrator(&store, StubExchange::quiet());
        let mut outcomes = orch.subscribe();

        let outcome = orch
            .settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap()
            .expect("settlement should run");

        assert_eq!(outcome.status, FightStatus::Finished);
        assert_eq!(outcome.winner, Some(a));
        assert!(!outcome.is_draw);
        assert_eq!(outcome.decided_by, "score-outcome");
        assert!(outcome.violations.is_empty());

        let fight = store.fight(fight_id).await.unwrap().unwrap();
        assert_eq!(fight.status, FightStatus::Finished);
        assert_eq!(fight.winner, Some(a));
        assert_eq!(fight.settling_by, None, "lock must be released");

        let participants = store.participants(fight_id).await.unwrap();
        let pa = participants.iter().find(|p| p.user_id == a).unwrap();
        assert_eq!(pa.final_score, Some(dec!(5)));

        let broadcast = outcomes.recv().await.unwrap();
        assert_eq!(broadcast.fight_id, fight_id);
        assert_eq!(broadcast.winner, Some(a));
    }

    #[tokio::test]
    async fn test_no_trades_fight_voids() {
        let store = Arc::new(MemoryStore::new());
        let (fight_id, _, _) = seed_ended_fight(&store);

        let orch = orchestrator(&store, StubExchange::quiet());
        let outcome = orch
            .settle_fight(fight_id, SettlementTrigger::Reconcile)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.status, FightStatus::NoContest);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.decided_by, "excluding-violations");

        let recorded = store.violations(fight_id).await.unwrap();
        let codes: Vec<_> = recorded.iter().map(|v| v.rule_code).collect();
        assert!(codes.contains(&RuleCode::ZeroZero));
        assert!(codes.contains(&RuleCode::MinVolume));
        assert!(recorded
            .iter()
            .all(|v| v.action == ViolationAction::NoContest));

        let fight = store.fight(fight_id).await.unwrap().unwrap();
        assert_eq!(fight.status, FightStatus::NoContest);
    }

    #[tokio::test]
    async fn test_cheater_forfeits_to_clean_opponent() {
        let store = Arc::new(MemoryStore::new());
        let a = UserId::new();
        let b = UserId::new();
        let mut fight = Fight::new(a, 15, dec!(100)).unwrap();
        fight.start(Utc::now() - Duration::minutes(20)).unwrap();
        let fight_id = fight.id;
        store.insert_fight(fight);

        let mut cheater =
            FightParticipant::new(fight_id, a, AccountId::from("0xaaa"), FightSlot::A);
        cheater.external_trades_detected = true;
        store.insert_participant(cheater).unwrap();
        store
            .insert_participant(FightParticipant::new(
                fight_id,
                b,
                AccountId::from("0xbbb"),
                FightSlot::B,
            ))
            .unwrap();

        // The cheater leads on score; the override hands the win over.
        seed_round_trip(&store, fight_id, a, dec!(5)).await;
        seed_round_trip(&store, fight_id, b, dec!(-3)).await;

        let orch = orchestrator(&store, StubExchange::quiet());
        let outcome = orch
            .settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.status, FightStatus::Finished);
        assert_eq!(outcome.winner, Some(b));
        assert_eq!(outcome.decided_by, "disqualify-cheater");

        // The fight still counts, so the audit record is FLAGGED.
        let recorded = store.violations(fight_id).await.unwrap();
        let external = recorded
            .iter()
            .find(|v| v.rule_code == RuleCode::ExternalTrades)
            .unwrap();
        assert_eq!(external.action, ViolationAction::Flagged);

        // Raw scores persist even though the winner was overridden.
        let participants = store.participants(fight_id).await.unwrap();
        let pa = participants.iter().find(|p| p.user_id == a).unwrap();
        assert_eq!(pa.final_score, Some(dec!(5)));
    }

    #[tokio::test]
    async fn test_cheater_with_tainted_opponent_voids() {
        let store = Arc::new(MemoryStore::new());
        let a = UserId::new();
        let b = UserId::new();
        let mut fight = Fight::new(a, 15, dec!(100)).unwrap();
        fight.start(Utc::now() - Duration::minutes(20)).unwrap();
        let fight_id = fight.id;
        store.insert_fight(fight);

        let mut cheater =
            FightParticipant::new(fight_id, a, AccountId::from("0xaaa"), FightSlot::A);
        cheater.external_trades_detected = true;
        store.insert_participant(cheater).unwrap();
        store
            .insert_participant(FightParticipant::new(
                fight_id,
                b,
                AccountId::from("0xbbb"),
                FightSlot::B,
            ))
            .unwrap();

        // Only the cheater traded; the opponent never met minimum volume.
        seed_round_trip(&store, fight_id, a, dec!(5)).await;

        let orch = orchestrator(&store, StubExchange::quiet());
        let outcome = orch
            .settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.status, FightStatus::NoContest);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.decided_by, "cheater-against-tainted-opponent");
    }

    #[tokio::test]
    async fn test_tied_scores_settle_as_draw() {
        let store = Arc::new(MemoryStore::new());
        let (fight_id, a, b) = seed_ended_fight(&store);
        seed_round_trip(&store, fight_id, a, dec!(5)).await;
        seed_round_trip(&store, fight_id, b, dec!(5)).await;

        let orch = orchestrator(&store, StubExchange::quiet());
        let outcome = orch
            .settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.status, FightStatus::Finished);
        assert!(outcome.is_draw);
        assert_eq!(outcome.winner, None);

        let fight = store.fight(fight_id).await.unwrap().unwrap();
        assert!(fight.is_draw);
    }

    #[tokio::test]
    async fn test_held_lock_skips_without_error() {
        let store = Arc::new(MemoryStore::new());
        let (fight_id, a, _) = seed_ended_fight(&store);
        seed_round_trip(&store, fight_id, a, dec!(5)).await;

        store
            .try_acquire_settlement_lock(
                fight_id,
                "job-reconcile-other",
                Utc::now(),
                settlement_lock_ttl(),
            )
            .await
            .unwrap();

        let orch = orchestrator(&store, StubExchange::quiet());
        let outcome = orch
            .settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap();
        assert!(outcome.is_none());

        // Untouched: still LIVE, still locked by the other process.
        let fight = store.fight(fight_id).await.unwrap().unwrap();
        assert_eq!(fight.status, FightStatus::Live);
        assert_eq!(fight.settling_by.as_deref(), Some("job-reconcile-other"));
    }

    #[tokio::test]
    async fn test_settled_fight_skips_on_retrigger() {
        let store = Arc::new(MemoryStore::new());
        let (fight_id, a, b) = seed_ended_fight(&store);
        seed_round_trip(&store, fight_id, a, dec!(5)).await;
        seed_round_trip(&store, fight_id, b, dec!(-3)).await;

        let orch = orchestrator(&store, StubExchange::quiet());
        orch.settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap()
            .unwrap();

        // The reconcile sweep hitting the same fight later is a no-op.
        let second = orch
            .settle_fight(fight_id, SettlementTrigger::Reconcile)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_venue_error_releases_lock_and_propagates() {
        let store = Arc::new(MemoryStore::new());
        let (fight_id, a, _) = seed_ended_fight(&store);
        // Open long with no close: settlement must price it off the venue.
        let open = FightTrade::new(
            fight_id,
            a,
            Symbol::from("BTC"),
            Side::Buy,
            Amount::new(dec!(0.01)),
            Price::new(dec!(50000)),
            Utc::now() - Duration::minutes(10),
        );
        store
            .apply_fill(
                fight_id,
                a,
                FillApplication {
                    trade: Some(open),
                    prefight_draw: None,
                },
            )
            .await
            .unwrap();

        let exchange = StubExchange {
            positions: Vec::new(),
            down: true,
        };
        let orch = orchestrator(&store, exchange);
        let err = orch
            .settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Exchange(_)));

        // Lock released, fight untouched; the reconcile sweep retries.
        let fight = store.fight(fight_id).await.unwrap().unwrap();
        assert_eq!(fight.status, FightStatus::Live);
        assert_eq!(fight.settling_by, None);
    }

    #[tokio::test]
    async fn test_open_position_scored_from_venue() {
        let store = Arc::new(MemoryStore::new());
        let (fight_id, a, b) = seed_ended_fight(&store);
        // A holds an open long at the bell; B closed flat at a loss.
        let open = FightTrade::new(
            fight_id,
            a,
            Symbol::from("BTC"),
            Side::Buy,
            Amount::new(dec!(0.01)),
            Price::new(dec!(50000)),
            Utc::now() - Duration::minutes(10),
        );
        store
            .apply_fill(
                fight_id,
                a,
                FillApplication {
                    trade: Some(open),
                    prefight_draw: None,
                },
            )
            .await
            .unwrap();
        seed_round_trip(&store, fight_id, b, dec!(-3)).await;

        let exchange = StubExchange {
            positions: vec![
                AccountPosition {
                    symbol: Symbol::from("BTC"),
                    amount: dec!(0.01),
                    entry_price: Price::new(dec!(50000)),
                    unrealized_pnl: dec!(20),
                    funding_since_open: dec!(0.5),
                    leverage: Some(3),
                },
                // Not a fight symbol; must not leak into the score.
                AccountPosition {
                    symbol: Symbol::from("ETH"),
                    amount: dec!(1),
                    entry_price: Price::new(dec!(3000)),
                    unrealized_pnl: dec!(999),
                    funding_since_open: Decimal::ZERO,
                    leverage: None,
                },
            ],
            down: false,
        };
        let orch = orchestrator(&store, exchange);
        let outcome = orch
            .settle_fight(fight_id, SettlementTrigger::Realtime)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.winner, Some(a));
        let score_a = outcome
            .scores
            .iter()
            .find(|s| s.user_id == a)
            .unwrap();
        // 100 stake + 20 unrealized - 0.5 funding => equity 119.5, score 19.5.
        assert_eq!(score_a.equity_virtual, dec!(119.5));
        assert_eq!(score_a.score_usdc, dec!(19.5));
    }

    #[tokio::test]
    async fn test_single_seat_fight_is_malformed() {
        let store = Arc::new(MemoryStore::new());
        let a = UserId::new();
        let mut fight = Fight::new(a, 15, dec!(100)).unwrap();
        fight.start(Utc::now() - Duration::minutes(20)).unwrap();
        let fight_id = fight.id;
        store.insert_fight(fight);
        store
            .insert_participant(FightParticipant::new(
                fight_id,
                a,
                AccountId::from("0xaaa"),
                FightSlot::A,
            ))
            .unwrap();

        let orch = orchestrator(&store, StubExchange::quiet());
        let err = orch
            .settle_fight(fight_id, SettlementTrigger::Reconcile)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SettlementError::MalformedFight { count: 1, .. }
        ));

        let fight = store.fight(fight_id).await.unwrap().unwrap();
        assert_eq!(fight.settling_by, None, "lock must be released on error");
    }
}
