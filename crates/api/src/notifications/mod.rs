//! Pushes task events from the event bus to WebSocket clients.
//!
//! Events are notifications only: the result stays in the store until a
//! client polls it.

use std::sync::Arc;

use axum::extract::ws::Message;
use ragbridge_core::task_events::{
    EVENT_TASK_COMPLETED, EVENT_TASK_FAILED, MSG_TYPE_TASK_COMPLETED, MSG_TYPE_TASK_FAILED,
};
use ragbridge_events::TaskEvent;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// JSON frame sent to browser clients for each task event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEventMessage<'a> {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub task_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'a str>,
    pub timestamp: &'a ragbridge_core::types::Timestamp,
}

impl<'a> TaskEventMessage<'a> {
    /// Map a bus event to its client frame. Unknown event types yield `None`.
    pub fn from_event(event: &'a TaskEvent) -> Option<Self> {
        let msg_type = match event.event_type.as_str() {
            EVENT_TASK_COMPLETED => MSG_TYPE_TASK_COMPLETED,
            EVENT_TASK_FAILED => MSG_TYPE_TASK_FAILED,
            _ => return None,
        };
        Some(Self {
            msg_type,
            task_id: &event.task_id,
            payload: event.payload.as_ref(),
            error_message: event.error_message.as_deref(),
            timestamp: &event.timestamp,
        })
    }
}

/// Routes task events to interested WebSocket connections.
pub struct TaskEventRouter {
    ws_manager: Arc<WsManager>,
}

impl TaskEventRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the routing loop until the [`EventBus`](ragbridge_events::EventBus)
    /// is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<TaskEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Task event router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, task event router shutting down");
                    break;
                }
            }
        }
    }

    async fn route_event(&self, event: &TaskEvent) {
        let Some(frame) = TaskEventMessage::from_event(event) else {
            tracing::warn!(event_type = %event.event_type, "Unknown task event type, skipping");
            return;
        };

        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, task_id = %event.task_id, "Failed to encode task event");
                return;
            }
        };

        let delivered = self
            .ws_manager
            .send_to_task(&event.task_id, Message::Text(text.into()))
            .await;
        tracing::debug!(task_id = %event.task_id, delivered, "Task event routed");
    }
}
