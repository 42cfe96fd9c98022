//! Task result types shared by the callback and poll paths.

use serde::Deserialize;

use crate::task_events::{EVENT_TASK_COMPLETED, EVENT_TASK_FAILED};

/// Terminal outcome of one asynchronous job, as reported by the remote
/// job runner.
///
/// There is no `Pending` variant: a task is pending exactly when the store
/// holds nothing for it.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    /// The job finished and produced a payload (usually a string answer).
    Completed { payload: serde_json::Value },
    /// The job failed with the given message.
    Error { error_message: String },
}

impl TaskResult {
    /// Wire name of the status (`completed` / `error`).
    pub fn status(&self) -> &'static str {
        match self {
            TaskResult::Completed { .. } => "completed",
            TaskResult::Error { .. } => "error",
        }
    }

    /// Bus event type announcing this result.
    pub fn event_type(&self) -> &'static str {
        match self {
            TaskResult::Completed { .. } => EVENT_TASK_COMPLETED,
            TaskResult::Error { .. } => EVENT_TASK_FAILED,
        }
    }
}

/// What a poll observed for a task id.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing stored: the job is still running, was never submitted, or its
    /// result was already drained (when tombstones are disabled).
    Pending,
    /// A terminal result, now removed from the store.
    Ready(TaskResult),
    /// The result was drained by an earlier poll and a tombstone is still
    /// retained for it.
    Consumed,
}

impl PollOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            PollOutcome::Pending => "pending",
            PollOutcome::Ready(result) => result.status(),
            PollOutcome::Consumed => "consumed",
        }
    }
}

/// Body posted by the remote job runner when a job finishes.
///
/// Every field is optional at the parsing layer so that a missing `taskId`
/// surfaces as a validation error rather than a deserialization failure.
/// Snake-case aliases match the payload shape the job runner emits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackInput {
    #[serde(default, alias = "task_id")]
    pub task_id: Option<String>,
    #[serde(default, alias = "response")]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CallbackInput {
    /// Resolve the body into the result it describes.
    ///
    /// A non-empty `error` wins over any payload; otherwise the payload is
    /// stored as-is (`null` when absent).
    pub fn into_result(self) -> TaskResult {
        match self.error {
            Some(error_message) if !error_message.is_empty() => TaskResult::Error { error_message },
            _ => TaskResult::Completed {
                payload: self.payload.unwrap_or(serde_json::Value::Null),
            },
        }
    }
}
