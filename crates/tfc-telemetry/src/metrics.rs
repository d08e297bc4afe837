//! Prometheus metrics for the settlement core.
//!
//! Covers:
//! - Settlement outcomes and duration
//! - Settlement lock contention
//! - Anti-cheat violations by rule
//! - Stake validator decisions
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Total settlements by terminal status and triggering process kind.
/// Labels: status (finished/no_contest), trigger (realtime/reconcile)
pub static SETTLEMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tfc_settlements_total",
        "Total fights settled by status and trigger",
        &["status", "trigger"]
    )
    .unwrap()
});

/// Settlement wall-clock duration in seconds, lock acquire to release.
pub static SETTLEMENT_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "tfc_settlement_duration_seconds",
        "Settlement duration in seconds from lock acquire to release",
        &["trigger"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap()
});

/// Settlement attempts that found the lock held by another process.
pub static LOCK_CONTENTION_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tfc_settlement_lock_contention_total",
        "Settlement attempts skipped because another process held the lock",
        &["trigger"]
    )
    .unwrap()
});

/// Anti-cheat violations persisted, by rule code.
pub static VIOLATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tfc_anticheat_violations_total",
        "Anti-cheat violations recorded by rule code",
        &["rule"]
    )
    .unwrap()
});

/// Orders rejected over the stake limit, by symbol.
pub static STAKE_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tfc_stake_rejections_total",
        "Orders rejected for exceeding available stake",
        &["symbol"]
    )
    .unwrap()
});

/// Order validation decisions.
/// Labels: outcome (cleared/rejected/not_in_fight)
pub static ORDER_VALIDATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tfc_order_validations_total",
        "Stake validator decisions by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// LIVE fights past their scheduled end, awaiting settlement.
pub static FIGHTS_PENDING_SETTLEMENT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "tfc_fights_pending_settlement",
        "LIVE fights past their scheduled end awaiting settlement"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a completed settlement.
    pub fn settlement_completed(status: &str, trigger: &str) {
        SETTLEMENTS_TOTAL
            .with_label_values(&[status, trigger])
            .inc();
    }

    /// Record settlement duration.
    pub fn settlement_duration(trigger: &str, seconds: f64) {
        SETTLEMENT_DURATION_SECONDS
            .with_label_values(&[trigger])
            .observe(seconds);
    }

    /// Record a settlement attempt that lost the lock race.
    pub fn lock_contended(trigger: &str) {
        LOCK_CONTENTION_TOTAL.with_label_values(&[trigger]).inc();
    }

    /// Record a persisted anti-cheat violation.
    pub fn violation_recorded(rule: &str) {
        VIOLATIONS_TOTAL.with_label_values(&[rule]).inc();
    }

    /// Record a stake-limit rejection.
    pub fn stake_rejected(symbol: &str) {
        STAKE_REJECTED_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record an order validation decision.
    pub fn order_validated(outcome: &str) {
        ORDER_VALIDATIONS_TOTAL
            .with_label_values(&[outcome])
            .inc();
    }

    /// Update the pending-settlement gauge from a watcher scan.
    pub fn fights_pending(count: i64) {
        FIGHTS_PENDING_SETTLEMENT.set(count);
    }
}

/// Encode all registered metrics in the Prometheus text format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
