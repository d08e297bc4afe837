//! Anti-cheat rule thresholds.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Thresholds for the five settlement rules.
///
/// Every field is optional in config files and can be overridden from the
/// environment; the defaults are the production values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiCheatConfig {
    /// Both final scores within this of zero marks a no-op fight (USDC).
    /// Default: 0.01.
    #[serde(default = "default_zero_pnl_threshold")]
    pub zero_pnl_threshold: Decimal,
    /// Minimum notional volume each participant must trade (USDC).
    /// Default: 10.
    #[serde(default = "default_min_volume_usdc")]
    pub min_volume_usdc: Decimal,
    /// Fights per user pair per window before the repeat rule fires.
    /// Default: 10.
    #[serde(default = "default_max_matchups_per_window")]
    pub max_matchups_per_window: u32,
    /// Rolling matchup window (hours). Default: 24.
    #[serde(default = "default_matchup_window_hours")]
    pub matchup_window_hours: i64,
    /// Prior shared-IP matchups in the window before the same-IP rule
    /// excludes instead of flags. Default: 2.
    #[serde(default = "default_same_ip_exclusion_threshold")]
    pub same_ip_exclusion_threshold: u32,
}

fn default_zero_pnl_threshold() -> Decimal {
    dec!(0.01)
}

fn default_min_volume_usdc() -> Decimal {
    dec!(10)
}

fn default_max_matchups_per_window() -> u32 {
    10
}

fn default_matchup_window_hours() -> i64 {
    24
}

fn default_same_ip_exclusion_threshold() -> u32 {
    2
}

impl Default for AntiCheatConfig {
    fn default() -> Self {
        Self {
            zero_pnl_threshold: default_zero_pnl_threshold(),
            min_volume_usdc: default_min_volume_usdc(),
            max_matchups_per_window: default_max_matchups_per_window(),
            matchup_window_hours: default_matchup_window_hours(),
            same_ip_exclusion_threshold: default_same_ip_exclusion_threshold(),
        }
    }
}

impl AntiCheatConfig {
    /// Defaults overridden by `TFC_*` environment values where present.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// This config with `TFC_*` environment values applied on top, used
    /// when file-sourced thresholds should still yield to the environment.
    pub fn with_env_overrides(mut self) -> Self {
        let config = &mut self;
        read_env("TFC_ZERO_PNL_THRESHOLD", &mut config.zero_pnl_threshold);
        read_env("TFC_MIN_VOLUME_USDC", &mut config.min_volume_usdc);
        read_env(
            "TFC_MAX_MATCHUPS_PER_WINDOW",
            &mut config.max_matchups_per_window,
        );
        read_env("TFC_MATCHUP_WINDOW_HOURS", &mut config.matchup_window_hours);
        read_env(
            "TFC_SAME_IP_EXCLUSION_THRESHOLD",
            &mut config.same_ip_exclusion_threshold,
        );
        self
    }

    /// The rolling window as a duration.
    pub fn matchup_window(&self) -> Duration {
        Duration::hours(self.matchup_window_hours)
    }
}

fn read_env<T: std::str::FromStr>(name: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse() {
            Ok(value) => *slot = value,
            Err(_) => warn!(%name, %raw, "Ignoring unparseable environment override"),
        }
    }
}
