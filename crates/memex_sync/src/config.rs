//! Transport configuration.

use crate::retry::RetryPolicy;
use std::time::Duration;

/// Configuration for a sync transport.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base server URL, e.g. `https://sync.example.com`.
    pub server_url: String,
    /// Stable identifier for this device, sent with every request.
    pub device_id: String,
    /// Bearer token; without one requests are sent unauthenticated.
    pub auth_token: Option<String>,
    /// Per-request timeout covering connect and response.
    pub request_timeout: Duration,
    /// Retry and backoff policy.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Create a configuration with the default timeout and retry policy.
    pub fn new(server_url: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            device_id: device_id.into(),
            auth_token: None,
            request_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the bearer token.
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generate a fresh device id for first-run provisioning.
    pub fn generate_device_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Absolute URL for an API path.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }
}
