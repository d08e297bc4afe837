//! Trade Fight Club settlement engine.
//!
//! Main application that wires the settlement core together:
//! - Exchange adapter (read-only venue queries)
//! - Fight store
//! - Anti-cheat engine
//! - Settlement orchestrator and its two trigger watchers
//! - Stake validator / trade recorder seams for the order router

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
