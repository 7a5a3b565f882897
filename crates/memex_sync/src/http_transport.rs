//! HTTP transport backed by reqwest.
//!
//! Each call runs the full retry state machine from
//! [`RetryPolicy`](crate::retry::RetryPolicy): rate limiting (429),
//! transient server errors (500, 502, 503, 504) and connection-level
//! failures back off exponentially and retry; 401 and other non-2xx
//! statuses fail immediately. A numeric `Retry-After` header on a 429
//! overrides the computed backoff for that attempt.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::protocol::{PullRequest, PullResponse, PushRequest, PushResponse, StatusResponse};
use crate::transport::SyncTransport;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// Reqwest-backed implementation of [`SyncTransport`].
///
/// Holds one pooled client for the transport's lifetime. Backoff sleeps
/// are cancellable: [`shutdown`](HttpTransport::shutdown) aborts any wait
/// in progress and makes future waits fail with [`SyncError::Cancelled`].
pub struct HttpTransport {
    client: reqwest::Client,
    config: SyncConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HttpTransport {
    /// Build a transport from the given configuration.
    pub fn new(config: SyncConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(SyncError::Network)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            client,
            config,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// The configuration this transport was built with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Cancel any backoff wait in progress and all future ones.
    pub fn shutdown(&self) {
        // Send only fails when every receiver is gone; we hold one.
        let _ = self.shutdown_tx.send(true);
    }

    /// Sleep between attempts, waking early on shutdown.
    async fn backoff_sleep(&self, delay: Duration) -> Result<()> {
        let mut shutdown = self.shutdown_rx.clone();
        if *shutdown.borrow() {
            return Err(SyncError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = shutdown.changed() => Err(SyncError::Cancelled),
        }
    }

    /// Run one logical call through the retry state machine.
    ///
    /// `send` builds and executes a fresh request on every invocation.
    async fn execute_with_retry<T, F, Fut>(&self, operation: &str, send: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = &self.config.retry;
        let mut retry_count: u32 = 0;
        loop {
            match send().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retriable() && policy.allows(retry_count) => {
                    let delay = match &err {
                        SyncError::RateLimited {
                            retry_after: Some(wait),
                        } => *wait,
                        _ => policy.delay_for(retry_count),
                    };
                    log::warn!(
                        "[HttpTransport] {} attempt {} failed ({}), retrying in {:?}",
                        operation,
                        retry_count + 1,
                        err,
                        delay
                    );
                    self.backoff_sleep(delay).await?;
                    retry_count += 1;
                }
                Err(err) => {
                    log::warn!("[HttpTransport] {} failed: {}", operation, err);
                    return Err(err);
                }
            }
        }
    }

    /// Attach the bearer token when configured.
    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Map a response to a protocol value or the matching error.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| SyncError::InvalidResponse(e.to_string()));
        }

        match status.as_u16() {
            401 => Err(SyncError::AuthFailed),
            429 => Err(SyncError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            }),
            500 | 502 | 503 | 504 => Err(SyncError::ServerError {
                status: status.as_u16(),
            }),
            code => {
                let message = response.text().await.unwrap_or_default();
                Err(SyncError::RequestFailed {
                    status: code,
                    message,
                })
            }
        }
    }

    async fn send_push(&self, request: &PushRequest) -> Result<PushResponse> {
        let url = self.config.endpoint("/v1/sync/push");
        let response = self
            .authorize(self.client.post(&url).json(request))
            .send()
            .await
            .map_err(SyncError::Network)?;
        Self::handle_response(response).await
    }

    async fn send_pull(&self, request: &PullRequest) -> Result<PullResponse> {
        let url = self.config.endpoint("/v1/sync/pull");
        let response = self
            .authorize(self.client.post(&url).json(request))
            .send()
            .await
            .map_err(SyncError::Network)?;
        Self::handle_response(response).await
    }

    async fn send_status(&self) -> Result<StatusResponse> {
        let url = self.config.endpoint("/v1/sync/status");
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(SyncError::Network)?;
        Self::handle_response(response).await
    }
}

/// Parse a numeric `Retry-After` header as whole seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?;
    let seconds = value.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn push(&self, request: &PushRequest) -> Result<PushResponse> {
        self.execute_with_retry("push", || self.send_push(request))
            .await
    }

    async fn pull(&self, request: &PullRequest) -> Result<PullResponse> {
        self.execute_with_retry("pull", || self.send_pull(request))
            .await
    }

    async fn check_status(&self) -> Result<StatusResponse> {
        self.execute_with_retry("status", || self.send_status())
            .await
    }
}
