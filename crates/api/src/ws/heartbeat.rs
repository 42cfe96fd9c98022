//! Keep-alive pings for WebSocket clients.
//!
//! Each tick pings every connection and prunes the ones whose socket task
//! has exited without deregistering.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Interval between heartbeat pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Ping all clients every `interval` until `cancel` is triggered.
pub async fn run(ws_manager: Arc<WsManager>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("WebSocket heartbeat stopping");
                break;
            }
            _ = ticker.tick() => {
                let pruned = ws_manager.ping_all().await;
                let remaining = ws_manager.connection_count().await;
                if pruned > 0 {
                    tracing::info!(pruned, remaining, "Heartbeat dropped dead WebSocket connections");
                } else {
                    tracing::debug!(remaining, "WebSocket heartbeat ping");
                }
            }
        }
    }
}
