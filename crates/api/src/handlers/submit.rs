//! Query submission: forwards chat queries to the remote job runner.
//!
//! Depending on [`SubmitMode`] and whether the body carries a callback URL,
//! the query is either queued (the runner answers later via `/callback`) or
//! answered inline in a single round trip.

use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use ragbridge_core::error::CoreError;
use serde::{Deserialize, Serialize};

use crate::config::SubmitMode;
use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::state::AppState;

/// Body of `POST /submit`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, alias = "callback_url")]
    pub callback_url: Option<String>,
}

/// Success body of `POST /submit`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SubmitResponse {
    /// Async path: poll `/poll?taskId=...` for the answer.
    Queued {
        #[serde(rename = "taskId")]
        task_id: String,
    },
    /// Sync path: the runner's answer, inline.
    Answered { response: serde_json::Value },
}

/// How a single submission will be handled.
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Queue { callback_url: &'a str },
    Answer,
}

/// POST /submit
pub async fn submit(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SubmitRequest>,
) -> AppResult<Json<SubmitResponse>> {
    let query = require_query(&input)?;

    let callback_url = input
        .callback_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty());

    match choose_route(state.config.submit_mode, callback_url)? {
        Route::Queue { callback_url } => {
            let submitted = state.upstream.submit_job(query, callback_url).await?;
            tracing::info!(
                task_id = %submitted.task_id,
                callback_url,
                "Query queued with job runner"
            );
            Ok(Json(SubmitResponse::Queued {
                task_id: submitted.task_id,
            }))
        }
        Route::Answer => {
            let answer = state.upstream.perform_rag(query).await?;
            tracing::info!("Query answered by job runner");
            Ok(Json(SubmitResponse::Answered {
                response: answer.response,
            }))
        }
    }
}

/// POST /api/perform_rag
///
/// Always answers inline, whatever the configured mode.
pub async fn submit_sync(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SubmitRequest>,
) -> AppResult<Json<SubmitResponse>> {
    let query = require_query(&input)?;

    let answer = state.upstream.perform_rag(query).await?;
    Ok(Json(SubmitResponse::Answered {
        response: answer.response,
    }))
}

fn require_query(input: &SubmitRequest) -> Result<&str, CoreError> {
    input
        .query
        .as_deref()
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| CoreError::Validation("'query' is required".into()))
}

fn choose_route(mode: SubmitMode, callback_url: Option<&str>) -> Result<Route<'_>, CoreError> {
    match (mode, callback_url) {
        (SubmitMode::Sync, Some(_)) => {
            tracing::debug!("Sync submit mode, ignoring callbackUrl");
            Ok(Route::Answer)
        }
        (SubmitMode::Sync, None) | (SubmitMode::Auto, None) => Ok(Route::Answer),
        (SubmitMode::Async, None) => {
            Err(CoreError::Validation("'callbackUrl' is required".into()))
        }
        (SubmitMode::Async, Some(url)) | (SubmitMode::Auto, Some(url)) => {
            validate_callback_url(url)?;
            Ok(Route::Queue { callback_url: url })
        }
    }
}

/// The job runner needs an absolute http(s) URL to call back.
fn validate_callback_url(url: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::Validation(format!("'callbackUrl' is not an absolute http(s) URL: {url}"));
    let uri: Uri = url.parse().map_err(|_| invalid())?;
    match (uri.scheme_str(), uri.authority()) {
        (Some("http") | Some("https"), Some(_)) => Ok(()),
        _ => Err(invalid()),
    }
}
