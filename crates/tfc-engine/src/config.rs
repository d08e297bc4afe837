//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tfc_anticheat::AntiCheatConfig;

use crate::error::{AppError, AppResult};

/// Exchange adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Info endpoint URL for mark price / position / order queries.
    #[serde(default = "default_info_url")]
    pub info_url: String,
}

fn default_info_url() -> String {
    "https://api.hyperliquid.xyz/info".to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            info_url: default_info_url(),
        }
    }
}

/// Settlement trigger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Realtime watcher poll interval (ms). Default: 1,000 (1 second).
    #[serde(default = "default_realtime_poll_ms")]
    pub realtime_poll_ms: u64,
    /// Reconcile sweep poll interval (ms). Default: 30,000 (30 seconds).
    #[serde(default = "default_reconcile_poll_ms")]
    pub reconcile_poll_ms: u64,
    /// Stable instance identifier baked into lock tokens. When unset, a
    /// random suffix is generated per acquisition.
    #[serde(default)]
    pub instance_id: Option<String>,
}

fn default_realtime_poll_ms() -> u64 {
    1_000
}

fn default_reconcile_poll_ms() -> u64 {
    30_000
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            realtime_poll_ms: default_realtime_poll_ms(),
            reconcile_poll_ms: default_reconcile_poll_ms(),
            instance_id: None,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus metrics port.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Rule thresholds. Environment values (`TFC_*`) take precedence over
    /// the config file; see [`AntiCheatConfig::from_env`].
    #[serde(default)]
    pub anticheat: AntiCheatConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("TFC_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}
