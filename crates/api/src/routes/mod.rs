pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{results, submit};
use crate::state::AppState;
use crate::ws;

/// Build the bridge route tree.
///
/// ```text
/// /submit                 POST  forward a query (async or sync)
/// /callback               POST  job runner delivers a result
/// /poll?taskId=           GET   drain a result (pending until delivered)
/// /ws                     GET   WebSocket task events
/// ```
pub fn bridge_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit::submit))
        .route("/callback", post(results::receive_callback))
        .route("/poll", get(results::poll_result))
        .route("/ws", get(ws::ws_handler))
}

/// Route paths used by the existing chat client and job runner deployment.
///
/// ```text
/// /api/perform_rag        POST  sync query forward
/// /api/webhook            POST  callback, GET poll (?task_id=)
/// /api/rag_callback       POST  callback
/// ```
pub fn legacy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/perform_rag", post(submit::submit_sync))
        .route(
            "/api/webhook",
            post(results::receive_callback).get(results::poll_result),
        )
        .route("/api/rag_callback", post(results::receive_callback))
}
