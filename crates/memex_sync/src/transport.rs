//! Transport abstraction over the sync server.

use crate::error::Result;
use crate::protocol::{PullRequest, PullResponse, PushRequest, PushResponse, StatusResponse};
use async_trait::async_trait;

/// A connection to the sync server.
///
/// The production implementation is
/// [`HttpTransport`](crate::http_transport::HttpTransport); tests swap in
/// scripted implementations. Implementations run their full retry budget
/// internally, so an error returned here is terminal for that call.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Push local changes and collect per-note verdicts.
    async fn push(&self, request: &PushRequest) -> Result<PushResponse>;

    /// Pull remote changes recorded after the request's sequence cursor.
    async fn pull(&self, request: &PullRequest) -> Result<PullResponse>;

    /// Probe server health and clock.
    async fn check_status(&self) -> Result<StatusResponse>;
}
