//! HTTP routes driven in-process through the router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use exprflow::{server, Orchestrator, SequentialIdGenerator};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_router() -> Router {
    let orchestrator = Orchestrator::builder()
        .with_id_generator(Arc::new(SequentialIdGenerator::new("expr")))
        .build();
    server::router(Arc::new(orchestrator))
}

async fn request(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value), String> {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(payload) => {
            let bytes = serde_json::to_vec(&payload)
                .map_err(|err| format!("serialize request body: {err}"))?;
            builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(bytes))
                .map_err(|err| format!("build request: {err}"))?
        }
        None => builder
            .body(Body::empty())
            .map_err(|err| format!("build request: {err}"))?,
    };

    let response = router
        .clone()
        .oneshot(req)
        .await
        .map_err(|err| format!("route request: {err}"))?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .map_err(|err| format!("read response body: {err}"))?;

    let parsed = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|err| format!("parse response body: {err}"))?
    };
    Ok((status, parsed))
}

#[tokio::test]
async fn calculate_and_poll_until_done() -> Result<(), String> {
    let router = test_router();

    let (status, created) = request(
        &router,
        Method::POST,
        "/api/v1/calculate",
        Some(json!({ "expression": "(1+2)*3" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({ "id": "expr-1" }));

    let (status, task) = request(&router, Method::GET, "/internal/task", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        task,
        json!({
            "task": { "id": 1, "arg1": 1.0, "arg2": 2.0, "operation": "+", "operation_time": 1000 }
        })
    );

    // the multiplication waits for the addition
    let (status, _) = request(&router, Method::GET, "/internal/task", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        &router,
        Method::POST,
        "/internal/task",
        Some(json!({ "id": 1, "result": 3.0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, task) = request(&router, Method::GET, "/internal/task", None).await?;
    assert_eq!(task["task"]["id"], 2);
    assert_eq!(task["task"]["arg1"], 3.0);
    assert_eq!(task["task"]["operation"], "*");

    let (_, expression) = request(&router, Method::GET, "/api/v1/expressions/expr-1", None).await?;
    assert_eq!(expression["expression"]["status"], "calculating");

    request(
        &router,
        Method::POST,
        "/internal/task",
        Some(json!({ "id": 2, "result": 9.0 })),
    )
    .await?;

    let (status, expression) =
        request(&router, Method::GET, "/api/v1/expressions/expr-1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(expression["expression"]["status"], "done");
    assert_eq!(expression["expression"]["result"], 9.0);
    assert_eq!(expression["expression"]["expression"], "(1+2)*3");
    Ok(())
}

#[tokio::test]
async fn calculate_rejects_bad_input() -> Result<(), String> {
    let router = test_router();

    for body in [
        json!({ "expression": "" }),
        json!({}),
        json!({ "expression": "(1+2" }),
        json!({ "expression": "2 ^ 3" }),
        json!({ "expression": "1/0" }),
    ] {
        let (status, error) =
            request(&router, Method::POST, "/api/v1/calculate", Some(body.clone())).await?;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        assert!(error["error"].is_string());
    }

    let (status, _) = request(
        &router,
        Method::POST,
        "/api/v1/calculate",
        Some(json!({ "id": "dup", "expression": "1+1" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, error) = request(
        &router,
        Method::POST,
        "/api/v1/calculate",
        Some(json!({ "id": "dup", "expression": "2+2" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "Expression already exists: dup");
    Ok(())
}

#[tokio::test]
async fn list_and_missing_expressions() -> Result<(), String> {
    let router = test_router();

    request(
        &router,
        Method::POST,
        "/api/v1/calculate",
        Some(json!({ "expression": "42" })),
    )
    .await?;
    request(
        &router,
        Method::POST,
        "/api/v1/calculate",
        Some(json!({ "expression": "1+1" })),
    )
    .await?;

    let (status, listed) = request(&router, Method::GET, "/api/v1/expressions", None).await?;
    assert_eq!(status, StatusCode::OK);
    let expressions = listed["expressions"]
        .as_array()
        .ok_or("expressions is not an array")?;
    assert_eq!(expressions.len(), 2);
    assert!(expressions
        .iter()
        .any(|e| e["status"] == "done" && e["result"] == 42.0));

    let (status, error) = request(&router, Method::GET, "/api/v1/expressions/nope", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "Expression not found: nope");
    Ok(())
}

#[tokio::test]
async fn worker_results_for_unknown_or_idle_tasks() -> Result<(), String> {
    let router = test_router();

    let (status, _) = request(
        &router,
        Method::POST,
        "/internal/task",
        Some(json!({ "id": 77, "result": 1.0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    request(
        &router,
        Method::POST,
        "/api/v1/calculate",
        Some(json!({ "expression": "1+1" })),
    )
    .await?;
    // task 1 exists but was never handed out
    let (status, _) = request(
        &router,
        Method::POST,
        "/internal/task",
        Some(json!({ "id": 1, "result": 2.0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stats) = request(&router, Method::GET, "/internal/stats", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["live_tasks"], 1);
    assert_eq!(stats["metrics"]["results_rejected"], 2);
    assert_eq!(stats["expressions"]["pending"], 1);
    Ok(())
}
