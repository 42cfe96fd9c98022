//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`TaskEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use ragbridge_core::task::TaskResult;
use ragbridge_core::types::TaskId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// TaskEvent
// ---------------------------------------------------------------------------

/// A task reached a terminal state (its callback arrived).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Dot-separated event name: `"task.completed"` or `"task.failed"`.
    pub event_type: String,

    pub task_id: TaskId,

    /// Result payload for completed tasks.
    pub payload: Option<serde_json::Value>,

    /// Failure message for failed tasks.
    pub error_message: Option<String>,

    /// When the callback was received (UTC).
    pub timestamp: DateTime<Utc>,
}

impl TaskEvent {
    /// Build the event announcing `result` for `task_id`.
    pub fn from_result(task_id: impl Into<TaskId>, result: &TaskResult) -> Self {
        let (payload, error_message) = match result {
            TaskResult::Completed { payload } => (Some(payload.clone()), None),
            TaskResult::Error { error_message } => (None, Some(error_message.clone())),
        };

        Self {
            event_type: result.event_type().to_string(),
            task_id: task_id.into(),
            payload,
            error_message,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use ragbridge_core::task::TaskResult;
/// use ragbridge_events::bus::{EventBus, TaskEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// let result = TaskResult::Completed { payload: serde_json::json!("done") };
/// bus.publish(TaskEvent::from_result("t1", &result));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<TaskEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped; the poll endpoint remains
    /// the source of truth for results.
    pub fn publish(&self, event: TaskEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        if self.sender.send(event).is_err() {
            tracing::trace!("Task event published with no subscribers");
        }
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
