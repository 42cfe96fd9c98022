#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use ragbridge_api::config::{LogFormat, RetentionSettings, ServerConfig, SubmitMode};
use ragbridge_api::router::{build_app_router, build_state};
use ragbridge_api::state::AppState;
use ragbridge_upstream::UpstreamConfig;

/// Base URL that refuses connections (nothing listens on port 1).
pub const UNREACHABLE_UPSTREAM: &str = "http://127.0.0.1:1";

/// Build a test `ServerConfig` pointing at `upstream_base`.
pub fn test_config(upstream_base: &str, submit_mode: SubmitMode) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        submit_mode,
        upstream: UpstreamConfig {
            sync_url: format!("{upstream_base}/perform_rag"),
            async_url: format!("{upstream_base}/perform_rag_async"),
            timeout: Duration::from_secs(5),
        },
        retention: RetentionSettings::default(),
        log_format: LogFormat::Text,
    }
}

pub fn test_state(upstream_base: &str, submit_mode: SubmitMode) -> AppState {
    build_state(test_config(upstream_base, submit_mode)).unwrap()
}

/// Build the full application router (same middleware stack as production).
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state)
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<String>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
