use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::orchestrator::Orchestrator;
use crate::server::handlers;

/// Build the router serving both the client API and the worker API.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/api/v1/calculate", post(handlers::calculate))
        .route("/api/v1/expressions", get(handlers::list_expressions))
        .route("/api/v1/expressions/{id}", get(handlers::get_expression))
        // workers poll with GET and report with POST on the same path
        .route(
            "/internal/task",
            get(handlers::pull_task).post(handlers::submit_result),
        )
        .route("/internal/stats", get(handlers::stats))
        .with_state(orchestrator)
}
