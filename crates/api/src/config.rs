use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use ragbridge_core::result_store::RetentionPolicy;
use ragbridge_upstream::UpstreamConfig;

/// Default job runner endpoints.
const DEFAULT_RAG_SYNC_URL: &str = "https://codebase-rag-backend.onrender.com/perform_rag";
const DEFAULT_RAG_ASYNC_URL: &str = "https://codebase-rag-backend.onrender.com/perform_rag_async";

/// Which path `POST /submit` takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Async when the body carries a `callbackUrl`, sync otherwise.
    Auto,
    /// Always submit a job and return a task id; `callbackUrl` is required.
    Async,
    /// Always forward the query and answer inline; `callbackUrl` is ignored.
    Sync,
}

impl SubmitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMode::Auto => "auto",
            SubmitMode::Async => "async",
            SubmitMode::Sync => "sync",
        }
    }
}

impl fmt::Display for SubmitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SubmitMode::Auto),
            "async" | "webhook" => Ok(SubmitMode::Async),
            "sync" => Ok(SubmitMode::Sync),
            _ => Err(()),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Result store retention and the sweep job that enforces it.
///
/// A value of `0` disables the corresponding bound.
#[derive(Debug, Clone)]
pub struct RetentionSettings {
    pub result_ttl_secs: u64,
    pub capacity: usize,
    pub consumed_retention_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Seconds as a chrono duration, or `None` when chrono cannot represent it.
fn retention_delta(secs: u64) -> Option<TimeDelta> {
    i64::try_from(secs).ok().and_then(TimeDelta::try_seconds)
}

impl RetentionSettings {
    /// Reject retention windows chrono cannot represent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, secs) in [
            ("RESULT_TTL_SECS", self.result_ttl_secs),
            ("CONSUMED_RETENTION_SECS", self.consumed_retention_secs),
        ] {
            if retention_delta(secs).is_none() {
                return Err(ConfigError {
                    key,
                    expected: "at most 9223372036854775 seconds",
                    value: secs.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Out-of-range windows (only reachable without [`validate`](Self::validate))
    /// saturate to the longest representable duration.
    pub fn policy(&self) -> RetentionPolicy {
        let secs = |s: u64| (s > 0).then(|| retention_delta(s).unwrap_or(TimeDelta::MAX));
        RetentionPolicy {
            result_ttl: secs(self.result_ttl_secs),
            capacity: (self.capacity > 0).then_some(self.capacity),
            consumed_retention: secs(self.consumed_retention_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            result_ttl_secs: 3600,
            capacity: 10_000,
            consumed_retention_secs: 0,
            sweep_interval_secs: 60,
        }
    }
}

/// A configuration variable held a value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{key} must be {expected}, got '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `150`). Always longer than
    /// the upstream timeout so a slow job runner surfaces as a JSON 500.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub submit_mode: SubmitMode,
    pub upstream: UpstreamConfig,
    pub retention: RetentionSettings,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `150`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                       |
    /// | `RAG_SYNC_URL`            | hosted `/perform_rag`      |
    /// | `RAG_ASYNC_URL`           | hosted `/perform_rag_async`|
    /// | `UPSTREAM_TIMEOUT_SECS`   | `120`                      |
    /// | `SUBMIT_MODE`             | `auto`                     |
    /// | `RESULT_TTL_SECS`         | `3600`                     |
    /// | `RESULT_STORE_CAPACITY`   | `10000`                    |
    /// | `CONSUMED_RETENTION_SECS` | `0`                        |
    /// | `SWEEP_INTERVAL_SECS`     | `60`                       |
    /// | `LOG_FORMAT`              | `text`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse(&lookup, "PORT", "3000", "a valid u16")?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 =
            parse(&lookup, "REQUEST_TIMEOUT_SECS", "150", "a valid u64")?;
        let shutdown_timeout_secs = parse(&lookup, "SHUTDOWN_TIMEOUT_SECS", "30", "a valid u64")?;

        let upstream_timeout_secs: u64 =
            parse(&lookup, "UPSTREAM_TIMEOUT_SECS", "120", "a valid u64")?;
        if upstream_timeout_secs >= request_timeout_secs {
            return Err(ConfigError {
                key: "UPSTREAM_TIMEOUT_SECS",
                expected: "shorter than REQUEST_TIMEOUT_SECS",
                value: upstream_timeout_secs.to_string(),
            });
        }
        let upstream = UpstreamConfig {
            sync_url: var("RAG_SYNC_URL", DEFAULT_RAG_SYNC_URL),
            async_url: var("RAG_ASYNC_URL", DEFAULT_RAG_ASYNC_URL),
            timeout: Duration::from_secs(upstream_timeout_secs),
        };

        let submit_mode = parse(&lookup, "SUBMIT_MODE", "auto", "one of auto, async, sync")?;

        let retention = RetentionSettings {
            result_ttl_secs: parse(&lookup, "RESULT_TTL_SECS", "3600", "a valid u64")?,
            capacity: parse(&lookup, "RESULT_STORE_CAPACITY", "10000", "a valid usize")?,
            consumed_retention_secs: parse(&lookup, "CONSUMED_RETENTION_SECS", "0", "a valid u64")?,
            sweep_interval_secs: parse(&lookup, "SWEEP_INTERVAL_SECS", "60", "a valid u64")?,
        };
        retention.validate()?;

        let log_format = parse(&lookup, "LOG_FORMAT", "text", "one of text, json")?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            submit_mode,
            upstream,
            retention,
            log_format,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError {
        key,
        expected,
        value,
    })
}
