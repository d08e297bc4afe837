//! Trade Fight Club settlement engine - Entry Point
//!
//! Runs the two settlement triggers (realtime watcher and trailing
//! reconcile sweep) over the fight store, serialized per fight through
//! the settlement lock.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Trade Fight Club settlement engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TFC_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tfc_telemetry::init_logging()?;

    info!("Starting TFC settlement engine v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > TFC_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("TFC_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = if std::path::Path::new(&config_path).exists() {
        tfc_engine::AppConfig::from_file(&config_path)?
    } else {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
        tfc_engine::AppConfig::default()
    };
    info!(
        info_url = %config.exchange.info_url,
        instance_id = ?config.settlement.instance_id,
        "Configuration loaded"
    );

    // Create and run the application
    let app = tfc_engine::Application::new(config)?;
    app.run().await?;

    Ok(())
}
