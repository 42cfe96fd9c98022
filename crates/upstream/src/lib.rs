//! HTTP client for the remote RAG job runner.
//!
//! The runner exposes two entry points: a synchronous `perform_rag` call
//! that answers inline, and an asynchronous submission that returns a task
//! id and later POSTs the result to a caller-supplied callback URL.

pub mod api;

pub use api::{RagApi, RagResponse, SubmitResponse, UpstreamApiError, UpstreamConfig};
