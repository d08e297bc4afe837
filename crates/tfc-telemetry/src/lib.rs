//! Prometheus metrics and structured logging for Trade Fight Club.
//!
//! - Settlement, lock, violation, and stake-validation metrics
//! - Structured JSON logging with tracing
//! - Text exposition for scraping

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{gather_metrics, Metrics};
