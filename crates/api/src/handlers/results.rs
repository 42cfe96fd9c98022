//! Callback ingress and poll egress for asynchronous job results.
//!
//! The job runner POSTs finished results to `/callback`; the browser polls
//! `/poll?taskId=...` until it sees a non-pending status. Polling drains the
//! result.

use axum::extract::State;
use axum::Json;
use ragbridge_core::bridge;
use ragbridge_core::task::{CallbackInput, PollOutcome, TaskResult};
use ragbridge_events::TaskEvent;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::{JsonBody, QueryParams};
use crate::state::AppState;

/// Acknowledgement returned to the job runner.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub status: &'static str,
}

/// Query parameters of `GET /poll`.
#[derive(Debug, Deserialize)]
pub struct PollParams {
    #[serde(default, rename = "taskId", alias = "task_id")]
    pub task_id: Option<String>,
}

/// Body of `GET /poll`.
///
/// `response` mirrors `payload` and `error` mirrors `errorMessage` for chat
/// clients that read the job runner's field names.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<PollOutcome> for PollResponse {
    fn from(outcome: PollOutcome) -> Self {
        let status = outcome.status();
        match outcome {
            PollOutcome::Pending | PollOutcome::Consumed => PollResponse {
                status,
                ..Default::default()
            },
            PollOutcome::Ready(TaskResult::Completed { payload }) => PollResponse {
                status,
                response: Some(payload.clone()),
                payload: Some(payload),
                ..Default::default()
            },
            PollOutcome::Ready(TaskResult::Error { error_message }) => PollResponse {
                status,
                error: Some(error_message.clone()),
                error_message: Some(error_message),
                ..Default::default()
            },
        }
    }
}

/// POST /callback
///
/// Accepts any well-formed callback, known task id or not, and publishes a
/// task event for WebSocket subscribers.
pub async fn receive_callback(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CallbackInput>,
) -> AppResult<Json<CallbackAck>> {
    let ingested = bridge::ingest(&state.store, input).await?;

    tracing::info!(
        task_id = %ingested.task_id,
        status = ingested.result.status(),
        replaced = ingested.outcome.replaced,
        "Received callback"
    );

    state
        .event_bus
        .publish(TaskEvent::from_result(ingested.task_id, &ingested.result));

    Ok(Json(CallbackAck { status: "received" }))
}

/// GET /poll
pub async fn poll_result(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<PollParams>,
) -> AppResult<Json<PollResponse>> {
    let outcome = bridge::poll(&state.store, params.task_id.as_deref()).await?;

    if let PollOutcome::Ready(result) = &outcome {
        tracing::info!(
            task_id = params.task_id.as_deref().unwrap_or_default(),
            status = result.status(),
            "Result delivered to poller"
        );
    } else {
        tracing::debug!(
            task_id = params.task_id.as_deref().unwrap_or_default(),
            status = outcome.status(),
            "Poll found no result"
        );
    }

    Ok(Json(PollResponse::from(outcome)))
}
