//! # Accelerator Broker
//!
//! Serves accelerator resources to remote clients. See the library docs for
//! the environment variables it reads.

use anyhow::{Context, Result};
use broker_runtime::{init_logging, BrokerConfig, BrokerRuntime};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = BrokerConfig::from_env();
    init_logging(&config.logging)?;

    info!("===========================================");
    info!("  Accelerator Broker v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    if let Ok(json) = serde_json::to_string(&config) {
        debug!(config = %json, "Effective configuration");
    }

    let runtime = BrokerRuntime::bind(config)
        .await
        .context("Failed to start broker")?;
    let shutdown = runtime.shutdown_handle();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        shutdown.shutdown();
    });

    info!("Broker is running. Press Ctrl+C to stop.");
    runtime.run().await.context("Broker failed")?;
    Ok(())
}
