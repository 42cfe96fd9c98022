//! Domain types and the callback/poll result buffer for the RAG bridge.
//!
//! - [`result_store::ResultStore`] holds one terminal result per task id and
//!   drains it on read.
//! - [`bridge`] implements the validated ingest and poll operations on top
//!   of the store.
//! - [`task`] defines the result and poll outcome types.

pub mod bridge;
pub mod error;
pub mod result_store;
pub mod task;
pub mod task_events;
pub mod types;
