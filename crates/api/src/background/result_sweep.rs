//! Periodic expiry of unpolled results and consumed tombstones.
//!
//! Callbacks for tasks nobody polls would otherwise stay in memory for the
//! life of the process. Runs on a fixed `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use ragbridge_core::result_store::ResultStore;
use tokio_util::sync::CancellationToken;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(store: Arc<ResultStore>, interval: Duration, cancel: CancellationToken) {
    let policy = store.policy();
    tracing::info!(
        result_ttl_secs = policy.result_ttl.map(|d| d.num_seconds()),
        consumed_retention_secs = policy.consumed_retention.map(|d| d.num_seconds()),
        interval_secs = interval.as_secs(),
        "Result sweep job started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Result sweep job stopping");
                break;
            }
            _ = ticker.tick() => {
                let purged = store.purge_expired().await;
                if purged.total() > 0 {
                    tracing::warn!(
                        results = purged.results,
                        tombstones = purged.tombstones,
                        "Result sweep: dropped expired entries"
                    );
                } else {
                    tracing::debug!("Result sweep: nothing expired");
                }
            }
        }
    }
}
