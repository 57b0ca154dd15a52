//! Request handlers for the client API and the worker API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::errors::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::scheduler::{ExpressionSummary, SchedulerStats, TaskId, TaskPayload};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub id: Option<String>,
    /// Missing text is reported as an empty expression
    #[serde(default)]
    pub expression: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpressionsResponse {
    pub expressions: Vec<ExpressionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpressionResponse {
    pub expression: ExpressionSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task: TaskPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResultRequest {
    pub id: TaskId,
    pub result: f64,
}

// ── Helpers ──────────────────────────────────────────────────────

pub type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

/// HTTP status for each orchestrator error
pub fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::EmptyExpression
        | OrchestratorError::Syntax { .. }
        | OrchestratorError::Semantic { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        OrchestratorError::DuplicateId { .. } | OrchestratorError::TaskNotAwaitingResult { .. } => {
            StatusCode::CONFLICT
        }
        OrchestratorError::ExpressionNotFound { .. } | OrchestratorError::TaskNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        OrchestratorError::Configuration { .. } | OrchestratorError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn api_error(err: OrchestratorError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ── Client API ───────────────────────────────────────────────────

/// Submit an expression for evaluation.
pub async fn calculate(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<CalculateRequest>,
) -> ApiResult<(StatusCode, Json<CalculateResponse>)> {
    let id = orchestrator
        .submit_expression(request.id, &request.expression)
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(CalculateResponse { id })))
}

pub async fn list_expressions(
    State(orchestrator): State<Arc<Orchestrator>>,
) -> Json<ExpressionsResponse> {
    Json(ExpressionsResponse {
        expressions: orchestrator.list_expressions(),
    })
}

pub async fn get_expression(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExpressionResponse>> {
    let expression = orchestrator.get_expression(&id).map_err(api_error)?;
    Ok(Json(ExpressionResponse { expression }))
}

// ── Worker API ───────────────────────────────────────────────────

/// Hand the next ready task to a worker. 404 means "poll again later".
pub async fn pull_task(State(orchestrator): State<Arc<Orchestrator>>) -> ApiResult<Json<TaskResponse>> {
    match orchestrator.pull_task().map_err(api_error)? {
        Some(task) => Ok(Json(TaskResponse { task })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no task available".into(),
            }),
        )),
    }
}

pub async fn submit_result(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<TaskResultRequest>,
) -> ApiResult<StatusCode> {
    orchestrator
        .submit_result(request.id, request.result)
        .map_err(api_error)?;
    Ok(StatusCode::OK)
}

pub async fn stats(State(orchestrator): State<Arc<Orchestrator>>) -> ApiResult<Json<SchedulerStats>> {
    orchestrator.stats().map(Json).map_err(api_error)
}
