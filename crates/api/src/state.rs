use std::sync::Arc;

use ragbridge_core::result_store::ResultStore;
use ragbridge_events::EventBus;
use ragbridge_upstream::RagApi;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Callback results waiting to be polled.
    pub store: Arc<ResultStore>,
    /// Client for the remote job runner.
    pub upstream: Arc<RagApi>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Task events published by the callback handler.
    pub event_bus: Arc<EventBus>,
}
