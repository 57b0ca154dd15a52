//! HTTP transport over the orchestrator.

pub mod handlers;
pub mod routes;

pub use routes::router;

use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::OrchestratorConfig;
use crate::orchestrator::Orchestrator;

/// Bind `host:port` from `config` and serve until Ctrl-C.
pub async fn serve(config: &OrchestratorConfig, orchestrator: Arc<Orchestrator>) -> std::io::Result<()> {
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Orchestrator listening on http://{}", addr);

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Orchestrator stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C, serving without graceful shutdown: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
