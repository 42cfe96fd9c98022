//! HTTP-level integration tests for the submit / callback / poll bridge.
//!
//! Requests go straight to the router via `tower::ServiceExt`; the job
//! runner is a stub axum server on a local port.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use common::{body_json, get, post_json, post_raw};
use ragbridge_api::config::{ServerConfig, SubmitMode};
use ragbridge_api::router::{build_app_router, build_state};
use serde_json::{json, Value};

/// Stub job runner: queues every job as `t1` and answers sync queries.
fn stub_runner() -> Router {
    Router::new()
        .route(
            "/perform_rag_async",
            post(|Json(body): Json<Value>| async move {
                if body["query"].is_string() && body["callback_url"].is_string() {
                    (StatusCode::OK, Json(json!({"taskId": "t1"})))
                } else {
                    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": "bad body"})))
                }
            }),
        )
        .route(
            "/perform_rag",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"response": format!("answer to {}", body["query"].as_str().unwrap_or(""))}))
            }),
        )
}

/// Stub job runner that counts calls, to prove validation short-circuits.
fn counting_runner(calls: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/perform_rag_async",
        post(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(json!({"taskId": "counted"}))
            }
        }),
    )
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_callback_poll_round_trip() {
    let upstream = common::spawn_server(stub_runner()).await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Auto));

    let response = post_json(
        app.clone(),
        "/submit",
        json!({"query": "what does X do", "callbackUrl": "https://x/cb"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"taskId": "t1"}));

    let response = post_json(
        app.clone(),
        "/callback",
        json!({"taskId": "t1", "payload": "X does Y"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "received"}));

    let response = get(app.clone(), "/poll?taskId=t1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["response"], "X does Y");
    assert_eq!(json["payload"], "X does Y");

    let response = get(app, "/poll?taskId=t1").await;
    assert_eq!(body_json(response).await, json!({"status": "pending"}));
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_error_status_and_body_are_propagated() {
    let upstream = common::spawn_server(Router::new().route(
        "/perform_rag_async",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
    ))
    .await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Auto));

    let response = post_json(
        app,
        "/submit",
        json!({"query": "q", "callbackUrl": "https://x/cb"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    assert!(json["error"].as_str().unwrap().contains("overloaded"));
}

#[tokio::test]
async fn submit_without_callback_answers_inline_in_auto_mode() {
    let upstream = common::spawn_server(stub_runner()).await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Auto));

    let response = post_json(app, "/submit", json!({"query": "hi"})).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"response": "answer to hi"}));
}

#[tokio::test]
async fn sync_mode_ignores_callback_url() {
    let upstream = common::spawn_server(stub_runner()).await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Sync));

    let response = post_json(
        app,
        "/submit",
        json!({"query": "hi", "callbackUrl": "https://x/cb"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"response": "answer to hi"}));
}

#[tokio::test]
async fn async_mode_rejects_missing_callback_before_calling_upstream() {
    let calls = Arc::new(AtomicUsize::new(0));
    let upstream = common::spawn_server(counting_runner(Arc::clone(&calls))).await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Async));

    let response = post_json(app, "/submit", json!({"query": "hi"})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_query_is_rejected_before_calling_upstream() {
    let calls = Arc::new(AtomicUsize::new(0));
    let upstream = common::spawn_server(counting_runner(Arc::clone(&calls))).await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Auto));

    let response = post_json(app.clone(), "/submit", json!({"callbackUrl": "https://x/cb"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app,
        "/submit",
        json!({"query": "   ", "callbackUrl": "https://x/cb"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_upstream_is_a_sanitized_500() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    let response = post_json(app, "/submit", json!({"query": "hi"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn malformed_upstream_body_is_a_sanitized_500() {
    let upstream = common::spawn_server(Router::new().route(
        "/perform_rag",
        post(|| async { "not json" }),
    ))
    .await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Auto));

    let response = post_json(app, "/submit", json!({"query": "hi"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn slow_upstream_times_out_as_json_500_before_request_timeout() {
    let upstream = common::spawn_server(Router::new().route(
        "/perform_rag",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({"response": "too late"}))
        }),
    ))
    .await;
    let sync_url = format!("{upstream}/perform_rag");
    let config = ServerConfig::from_lookup(|key| match key {
        "RAG_SYNC_URL" => Some(sync_url.clone()),
        "REQUEST_TIMEOUT_SECS" => Some("2".to_string()),
        "UPSTREAM_TIMEOUT_SECS" => Some("1".to_string()),
        _ => None,
    })
    .unwrap();
    let app = build_app_router(build_state(config).unwrap());

    let response = post_json(app, "/submit", json!({"query": "hi"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Callback and poll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_for_unknown_task_is_pending() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    let response = get(app, "/poll?taskId=never-submitted").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "pending"}));
}

#[tokio::test]
async fn poll_without_task_id_is_a_validation_error() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    let response = get(app, "/poll").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json.get("status").is_none());
}

#[tokio::test]
async fn callback_without_task_id_does_not_touch_the_store() {
    let state = common::test_state(common::UNREACHABLE_UPSTREAM, SubmitMode::Auto);
    let app = common::build_test_app(state.clone());

    post_json(app.clone(), "/callback", json!({"taskId": "other", "payload": "keep"})).await;

    let response = post_json(app.clone(), "/callback", json!({"payload": "orphan"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert_eq!(state.store.len().await, 1);

    let response = get(app, "/poll?taskId=other").await;
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["payload"], "keep");
}

#[tokio::test]
async fn error_wins_over_payload() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    post_json(
        app.clone(),
        "/callback",
        json!({"taskId": "t1", "payload": "X", "error": "E"}),
    )
    .await;

    let response = get(app, "/poll?taskId=t1").await;
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["errorMessage"], "E");
    assert!(json.get("payload").is_none());
}

#[tokio::test]
async fn latest_callback_wins() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    post_json(app.clone(), "/callback", json!({"taskId": "t1", "payload": "first"})).await;
    post_json(app.clone(), "/callback", json!({"taskId": "t1", "payload": "second"})).await;

    let json = body_json(get(app.clone(), "/poll?taskId=t1").await).await;
    assert_eq!(json["payload"], "second");

    let json = body_json(get(app, "/poll?taskId=t1").await).await;
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn malformed_callback_json_is_a_sanitized_500() {
    let state = common::test_state(common::UNREACHABLE_UPSTREAM, SubmitMode::Auto);
    let app = common::build_test_app(state.clone());

    let response = post_raw(app, "/callback", "{not json").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "An internal error occurred");
    assert!(state.store.is_empty().await);
}

#[tokio::test]
async fn wrongly_typed_callback_field_is_a_validation_error() {
    let state = common::test_state(common::UNREACHABLE_UPSTREAM, SubmitMode::Auto);
    let app = common::build_test_app(state.clone());

    let response = post_json(app, "/callback", json!({"taskId": 42, "payload": "x"})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(state.store.is_empty().await);
}

#[tokio::test]
async fn wrongly_typed_submit_query_is_a_validation_error() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    let response = post_json(app, "/submit", json!({"query": 5})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unparsable_poll_query_is_a_json_bad_request() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    let response = get(app, "/poll?taskId=a&taskId=b").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn callback_publishes_task_event() {
    let state = common::test_state(common::UNREACHABLE_UPSTREAM, SubmitMode::Auto);
    let mut events = state.event_bus.subscribe();
    let app = common::build_test_app(state);

    post_json(app, "/callback", json!({"taskId": "t7", "error": "runner crashed"})).await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, "task.failed");
    assert_eq!(event.task_id, "t7");
    assert_eq!(event.error_message.as_deref(), Some("runner crashed"));
}

// ---------------------------------------------------------------------------
// Legacy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn legacy_webhook_accepts_snake_case_fields() {
    let app = common::build_test_app(common::test_state(
        common::UNREACHABLE_UPSTREAM,
        SubmitMode::Auto,
    ));

    let response = post_json(
        app.clone(),
        "/api/webhook",
        json!({"task_id": "legacy", "response": "old shape"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(app, "/api/webhook?task_id=legacy").await).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["response"], "old shape");
}

#[tokio::test]
async fn legacy_perform_rag_answers_inline_even_in_async_mode() {
    let upstream = common::spawn_server(stub_runner()).await;
    let app = common::build_test_app(common::test_state(&upstream, SubmitMode::Async));

    let response = post_json(app, "/api/perform_rag", json!({"query": "hi"})).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"response": "answer to hi"}));
}
