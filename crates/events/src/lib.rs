//! In-process task event bus.
//!
//! [`EventBus`] fans out [`TaskEvent`]s to any number of subscribers (the
//! WebSocket router in the API server, tests, future sinks).

pub mod bus;

pub use bus::{EventBus, TaskEvent};
