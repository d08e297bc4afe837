//! Settlement triggers: the realtime watcher and the reconcile sweep.
//!
//! Both are interval loops over the same scan: LIVE fights whose scheduled
//! end has passed by at least this watcher's grace. The realtime watcher
//! runs with zero grace; the reconcile job trails it by 60 seconds and
//! picks up anything the realtime path missed, crashed out of, or lost to
//! a stale lock.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use tfc_store::FightStore;
use tfc_telemetry::Metrics;

use crate::lock::SettlementTrigger;
use crate::orchestrator::SettlementOrchestrator;

/// Reconcile sweeps only consider fights whose end passed at least this
/// long ago, leaving the realtime path first claim.
pub const RECONCILE_GRACE_SECS: i64 = 60;

/// Scans for due fights and hands each to the orchestrator.
pub struct SettlementWatcher {
    store: Arc<dyn FightStore>,
    orchestrator: Arc<SettlementOrchestrator>,
    trigger: SettlementTrigger,
    poll_interval: StdDuration,
    grace: Duration,
}

impl SettlementWatcher {
    /// Realtime watcher: fires as soon as a fight's end passes.
    pub fn realtime(
        store: Arc<dyn FightStore>,
        orchestrator: Arc<SettlementOrchestrator>,
        poll_interval: StdDuration,
    ) -> Self {
        Self {
            store,
            orchestrator,
            trigger: SettlementTrigger::Realtime,
            poll_interval,
            grace: Duration::zero(),
        }
    }

    /// Reconcile job: trails the realtime watcher by the grace buffer.
    pub fn reconcile(
        store: Arc<dyn FightStore>,
        orchestrator: Arc<SettlementOrchestrator>,
        poll_interval: StdDuration,
    ) -> Self {
        Self {
            store,
            orchestrator,
            trigger: SettlementTrigger::Reconcile,
            poll_interval,
            grace: Duration::seconds(RECONCILE_GRACE_SECS),
        }
    }

    /// Run the scan loop until the task is aborted.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        info!(
            trigger = self.trigger.label(),
            interval_ms = self.poll_interval.as_millis() as u64,
            grace_secs = self.grace.num_seconds(),
            "Settlement watcher started"
        );
        loop {
            interval.tick().await;
            self.sweep_once().await;
        }
    }

    /// One scan: settle every due fight. Per-fight errors are logged and
    /// left for the next sweep.
    pub async fn sweep_once(&self) {
        let due = match self
            .store
            .live_fights_past_end(Utc::now(), self.grace)
            .await
        {
            Ok(fights) => fights,
            Err(e) => {
                warn!(trigger = self.trigger.label(), error = %e, "Settlement scan failed");
                return;
            }
        };
        // The gauge tracks the zero-grace scan only.
        if self.trigger == SettlementTrigger::Realtime {
            Metrics::fights_pending(due.len() as i64);
        }
        if due.is_empty() {
            return;
        }
        debug!(
            trigger = self.trigger.label(),
            due = due.len(),
            "Fights due for settlement"
        );

        for fight in due {
            if let Err(e) = self.orchestrator.settle_fight(fight.id, self.trigger).await {
                error!(
                    fight_id = %fight.id,
                    trigger = self.trigger.label(),
                    error = %e,
                    "Settlement attempt failed"
                );
            }
        }
    }
}
