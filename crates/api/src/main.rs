use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ragbridge_api::background::result_sweep;
use ragbridge_api::config::{LogFormat, ServerConfig};
use ragbridge_api::notifications::TaskEventRouter;
use ragbridge_api::router::{build_app_router, build_state};
use ragbridge_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| panic!("Invalid configuration: {e}"));

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ragbridge_api=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!(
        host = %config.host,
        port = config.port,
        submit_mode = %config.submit_mode,
        sync_url = %config.upstream.sync_url,
        async_url = %config.upstream.async_url,
        "Loaded server configuration"
    );

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let sweep_interval = config.retention.sweep_interval();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    // --- App state ---
    let state = build_state(config).expect("Failed to build upstream HTTP client");

    // --- Heartbeat ---
    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_handle = tokio::spawn(ws::heartbeat::run(
        Arc::clone(&state.ws_manager),
        ws::heartbeat::HEARTBEAT_INTERVAL,
        heartbeat_cancel.clone(),
    ));

    // --- Task event router (bus -> WebSocket clients) ---
    let event_router = TaskEventRouter::new(Arc::clone(&state.ws_manager));
    let router_handle = tokio::spawn(event_router.run(state.event_bus.subscribe()));

    // --- Result sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(result_sweep::run(
        Arc::clone(&state.store),
        sweep_interval,
        sweep_cancel.clone(),
    ));

    tracing::info!("Background services started (heartbeat, event router, result sweep)");

    let ws_manager = Arc::clone(&state.ws_manager);
    let store = Arc::clone(&state.store);
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, sweep_handle).await;
    tracing::info!("Result sweep stopped");

    // The router exits once every bus sender is gone; the app (and its
    // state clones) was consumed by `axum::serve`.
    let _ = tokio::time::timeout(shutdown_timeout, router_handle).await;
    tracing::info!("Task event router stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, heartbeat_handle).await;

    let stats = store.stats().await;
    if stats.results > 0 {
        tracing::warn!(
            unpolled = stats.results,
            "Discarding unpolled results (the store is not persisted)"
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
