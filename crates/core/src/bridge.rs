//! Validated ingest and poll operations over a [`ResultStore`].
//!
//! Validation happens before the store is touched: a request without a
//! task id never mutates or drains anything.

use crate::error::CoreError;
use crate::result_store::{InsertOutcome, ResultStore};
use crate::task::{CallbackInput, PollOutcome, TaskResult};
use crate::types::TaskId;

/// A callback that was accepted and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub task_id: TaskId,
    pub result: TaskResult,
    pub outcome: InsertOutcome,
}

/// Check that a task id was supplied and is not blank.
pub fn require_task_id(task_id: Option<&str>) -> Result<&str, CoreError> {
    match task_id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(CoreError::Validation("'taskId' is required".into())),
    }
}

/// Record a job result delivered by the remote job runner.
///
/// Unknown task ids are accepted: the runner is never told that a callback
/// was unexpected.
pub async fn ingest(store: &ResultStore, input: CallbackInput) -> Result<Ingested, CoreError> {
    let task_id = require_task_id(input.task_id.as_deref())?.to_string();
    let result = input.into_result();
    let outcome = store.insert(task_id.clone(), result.clone()).await;
    Ok(Ingested {
        task_id,
        result,
        outcome,
    })
}

/// Poll for a result, draining it if one is ready.
pub async fn poll(store: &ResultStore, task_id: Option<&str>) -> Result<PollOutcome, CoreError> {
    let task_id = require_task_id(task_id)?;
    Ok(store.take(task_id).await)
}
