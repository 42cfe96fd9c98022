use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use ragbridge_core::types::TaskId;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Task ids this connection asked to hear about. Empty means every task.
    pub subscriptions: HashSet<TaskId>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
}

impl WsConnection {
    fn wants(&self, task_id: &str) -> bool {
        self.subscriptions.is_empty() || self.subscriptions.contains(task_id)
    }
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            subscriptions: HashSet::new(),
            sender: tx,
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Restrict a connection to events for `task_id` (in addition to any
    /// task it already follows). Returns `false` for an unknown connection.
    pub async fn subscribe(&self, conn_id: &str, task_id: TaskId) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.subscriptions.insert(task_id);
                true
            }
            None => false,
        }
    }

    /// Stop following `task_id`. Dropping the last subscription puts the
    /// connection back on the all-tasks feed.
    pub async fn unsubscribe(&self, conn_id: &str, task_id: &str) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => conn.subscriptions.remove(task_id),
            None => false,
        }
    }

    /// Send a message to every connection interested in `task_id`.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_task(&self, task_id: &str, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.wants(task_id)) {
            let _ = conn.sender.send(message.clone());
            count += 1;
        }
        count
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    pub async fn broadcast(&self, message: Message) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(message.clone());
        }
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client and drop connections
    /// whose socket task has already gone away.
    ///
    /// Returns the number of connections removed.
    pub async fn ping_all(&self) -> usize {
        let mut conns = self.connections.write().await;
        let before = conns.len();
        conns.retain(|conn_id, conn| {
            let alive = conn.sender.send(Message::Ping(Bytes::new())).is_ok();
            if !alive {
                tracing::debug!(conn_id = %conn_id, "Dropping dead WebSocket connection");
            }
            alive
        });
        before - conns.len()
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
