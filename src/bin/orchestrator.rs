use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, Level};

use exprflow::{server, Orchestrator, OrchestratorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = OrchestratorConfig::from_env().context("Failed to load configuration")?;

    // Set up logging
    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default tracing subscriber")?;

    info!(
        "Operation times (ms): + {} / - {} / * {} / / {}",
        config.durations.addition,
        config.durations.subtraction,
        config.durations.multiplication,
        config.durations.division
    );
    match config.task_lease {
        Some(lease) => info!("Task lease: {:?}", lease),
        None => info!("Task lease disabled"),
    }

    let orchestrator = Arc::new(Orchestrator::new(config.clone()));
    server::serve(&config, orchestrator)
        .await
        .with_context(|| format!("Server on {} failed", config.address()))?;

    Ok(())
}
