//! WebSocket infrastructure for pushing task events to browser clients.
//!
//! Provides connection management, heartbeat monitoring, and the HTTP
//! upgrade handler used by Axum routes.

mod handler;
pub mod heartbeat;
pub mod manager;

pub use handler::{ws_handler, ClientMessage};
pub use manager::WsManager;
