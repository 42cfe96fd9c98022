//! Event names for task lifecycle notifications.
//!
//! Bus event types are dot-separated; WebSocket message types are the
//! snake_case form sent to browser clients.

/// A callback delivered a successful result.
pub const EVENT_TASK_COMPLETED: &str = "task.completed";

/// A callback reported a failure.
pub const EVENT_TASK_FAILED: &str = "task.failed";

/// WebSocket message type for [`EVENT_TASK_COMPLETED`].
pub const MSG_TYPE_TASK_COMPLETED: &str = "task_completed";

/// WebSocket message type for [`EVENT_TASK_FAILED`].
pub const MSG_TYPE_TASK_FAILED: &str = "task_failed";
