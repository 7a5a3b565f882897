//! Error types for the sync engine.

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the transport and the sync coordinator.
///
/// Transport implementations run their full retry budget before returning,
/// so a [`RateLimited`](SyncError::RateLimited),
/// [`ServerError`](SyncError::ServerError) or
/// [`Network`](SyncError::Network) value means the budget is exhausted.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The server rejected our credentials (HTTP 401). Never retried.
    #[error("authentication failed")]
    AuthFailed,

    /// Rate limited by the server (HTTP 429).
    #[error("rate limited by server")]
    RateLimited {
        /// Wait requested through the `Retry-After` header, if the server
        /// sent one on the final attempt.
        retry_after: Option<Duration>,
    },

    /// The server failed transiently (HTTP 500, 502, 503 or 504).
    #[error("server error (HTTP {status})")]
    ServerError {
        /// HTTP status code of the final attempt.
        status: u16,
    },

    /// The server rejected the request (any other non-2xx status).
    /// Never retried.
    #[error("request failed (HTTP {status}): {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body as returned by the server.
        message: String,
    },

    /// Connection-level failure: refused, reset, DNS, timeout.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered 2xx with a body we could not parse.
    #[error("invalid server response: {0}")]
    InvalidResponse(String),

    /// A sync cycle is already in progress on this coordinator.
    #[error("sync already in progress")]
    AlreadyRunning,

    /// The host reports the device offline; no request was made.
    #[error("device is offline")]
    Offline,

    /// Shutdown was requested while waiting to retry.
    #[error("sync cancelled by shutdown")]
    Cancelled,

    /// The local change store failed.
    #[error(transparent)]
    Store(#[from] memex_core::MemexError),
}

impl SyncError {
    /// Whether the retry state machine may re-attempt after this error.
    ///
    /// Rate limiting, transient server failures and connection-level
    /// failures are retriable; everything else is terminal on the first
    /// occurrence.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SyncError::RateLimited { .. } | SyncError::ServerError { .. } | SyncError::Network(_)
        )
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SyncError>;
