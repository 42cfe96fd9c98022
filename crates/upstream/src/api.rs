//! REST client for the RAG job runner endpoints, built on [`reqwest`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Endpoints and limits for the remote job runner.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Full URL of the synchronous query endpoint.
    pub sync_url: String,
    /// Full URL of the asynchronous submission endpoint.
    pub async_url: String,
    /// Timeout for a single outbound request.
    pub timeout: Duration,
}

/// Body sent to the job runner.
#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

/// Response of the asynchronous submission endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubmitResponse {
    /// Runner-assigned identifier for the queued job.
    #[serde(alias = "taskId")]
    pub task_id: String,
}

/// Response of the synchronous query endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RagResponse {
    /// The generated answer (usually a string).
    pub response: serde_json::Value,
}

/// Errors from the job runner REST layer.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamApiError {
    /// The HTTP request failed (network, DNS, TLS, timeout) or the response
    /// body could not be decoded.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The job runner returned a non-2xx status code.
    #[error("Upstream error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

/// HTTP client for the RAG job runner.
#[derive(Debug, Clone)]
pub struct RagApi {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl RagApi {
    /// Build a client with the configured request timeout.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Queue a query for asynchronous processing.
    ///
    /// The runner will POST the result to `callback_url` when done. Returns
    /// the runner-assigned task id.
    pub async fn submit_job(
        &self,
        query: &str,
        callback_url: &str,
    ) -> Result<SubmitResponse, UpstreamApiError> {
        let body = QueryRequest {
            query,
            callback_url: Some(callback_url),
        };
        let response = self
            .client
            .post(&self.config.async_url)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Run a query and wait for the answer in a single round trip.
    pub async fn perform_rag(&self, query: &str) -> Result<RagResponse, UpstreamApiError> {
        let body = QueryRequest {
            query,
            callback_url: None,
        };
        let response = self
            .client
            .post(&self.config.sync_url)
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`UpstreamApiError::ApiError`] carrying status and body text.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, UpstreamApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::debug!(status = status.as_u16(), body = %body, "Upstream returned error status");
            return Err(UpstreamApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, UpstreamApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
