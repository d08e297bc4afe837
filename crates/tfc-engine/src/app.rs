//! Main application orchestration.
//!
//! Construction wires every component explicitly: one store handle, one
//! exchange client, one anti-cheat engine, one orchestrator, built at
//! startup and passed down by `Arc`. No module-level globals.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use tfc_anticheat::AntiCheatEngine;
use tfc_exchange::{ExchangeClient, RestExchangeClient};
use tfc_settlement::{SettlementOrchestrator, SettlementWatcher};
use tfc_stake::{StakeValidator, TradeRecorder};
use tfc_store::{FightStore, MemoryStore};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    store: Arc<dyn FightStore>,
    orchestrator: Arc<SettlementOrchestrator>,
    stake_validator: Arc<StakeValidator>,
    trade_recorder: Arc<TradeRecorder>,
}

impl Application {
    /// Create a new application from configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let store: Arc<dyn FightStore> = Arc::new(MemoryStore::new());
        let exchange: Arc<dyn ExchangeClient> =
            Arc::new(RestExchangeClient::new(&config.exchange.info_url)?);

        // File thresholds, overridden by TFC_* environment values.
        let rules = config.anticheat.clone().with_env_overrides();
        let anticheat = Arc::new(AntiCheatEngine::new(Arc::clone(&store), rules));

        let mut orchestrator = SettlementOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&exchange),
            Arc::clone(&anticheat),
        );
        if let Some(instance_id) = &config.settlement.instance_id {
            orchestrator = orchestrator.with_instance_id(instance_id.clone());
        }

        let stake_validator = Arc::new(StakeValidator::new(
            Arc::clone(&store),
            Arc::clone(&exchange),
        ));
        let trade_recorder = Arc::new(TradeRecorder::new(Arc::clone(&store)));

        Ok(Self {
            config,
            store,
            orchestrator: Arc::new(orchestrator),
            stake_validator,
            trade_recorder,
        })
    }

    /// The fight store handle, for the (out-of-process-scope) API layer.
    pub fn store(&self) -> Arc<dyn FightStore> {
        Arc::clone(&self.store)
    }

    /// Pre-submission order check, called in-process by the order router.
    pub fn stake_validator(&self) -> Arc<StakeValidator> {
        Arc::clone(&self.stake_validator)
    }

    /// Fill ingestion seam, called in-process by the fill stream consumer.
    pub fn trade_recorder(&self) -> Arc<TradeRecorder> {
        Arc::clone(&self.trade_recorder)
    }

    /// Run the settlement loops until shutdown.
    pub async fn run(self) -> AppResult<()> {
        info!(
            realtime_poll_ms = self.config.settlement.realtime_poll_ms,
            reconcile_poll_ms = self.config.settlement.reconcile_poll_ms,
            "Starting settlement engine"
        );

        let realtime = SettlementWatcher::realtime(
            Arc::clone(&self.store),
            Arc::clone(&self.orchestrator),
            Duration::from_millis(self.config.settlement.realtime_poll_ms),
        );
        let reconcile = SettlementWatcher::reconcile(
            Arc::clone(&self.store),
            Arc::clone(&self.orchestrator),
            Duration::from_millis(self.config.settlement.reconcile_poll_ms),
        );

        let realtime_handle = tokio::spawn(realtime.run());
        let reconcile_handle = tokio::spawn(reconcile.run());

        // Downstream consumers (broadcast relay, admin feeds) subscribe the
        // same way; here the engine just journals every settled outcome.
        let mut outcomes = self.orchestrator.subscribe();
        let mut settled_count = 0u64;

        info!("Entering main event loop");
        loop {
            tokio::select! {
                outcome = outcomes.recv() => {
                    match outcome {
                        Ok(outcome) => {
                            settled_count += 1;
                            info!(
                                fight_id = %outcome.fight_id,
                                status = %outcome.status,
                                winner = ?outcome.winner,
                                is_draw = outcome.is_draw,
                                decided_by = outcome.decided_by,
                                violations = outcome.violations.len(),
                                "Settlement outcome (#{settled_count})"
                            );
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Outcome journal lagged behind settlements");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(settled_count, "Shutting down");
        realtime_handle.abort();
        reconcile_handle.abort();

        Ok(())
    }
}
