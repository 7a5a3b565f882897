//! Wire protocol types for the sync server API.
//!
//! All bodies are JSON with camelCase field names, exchanged over three
//! endpoints: `POST /v1/sync/push`, `POST /v1/sync/pull` and
//! `GET /v1/sync/status`. Requests carry a bearer token when the
//! transport is configured with one; 429 responses may carry a
//! `Retry-After` header in seconds.

use chrono::{DateTime, Utc};
use memex_core::{ChangeOperation, Note, QueuedChange, content_hash};
use serde::{Deserialize, Serialize};

// ==================== Push ====================

/// Body of `POST /v1/sync/push`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    /// Device issuing the changes.
    pub device_id: String,
    /// Coalesced changes, at most one per note.
    pub changes: Vec<PushChange>,
}

/// One change in a push request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushChange {
    /// Note the change applies to.
    pub note_id: String,
    /// What happened to the note.
    pub operation: ChangeOperation,
    /// Local version of the change.
    pub version: i64,
    /// Content hash for server-side comparison; omitted for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Full note snapshot; omitted for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Note>,
}

impl PushChange {
    /// Wire form of a queued change. Deletes drop payload and hash.
    pub fn from_queued(change: &QueuedChange) -> Self {
        let payload = match change.operation {
            ChangeOperation::Delete => None,
            _ => change.payload.clone(),
        };
        let content_hash = payload.as_ref().map(content_hash);
        Self {
            note_id: change.note_id.clone(),
            operation: change.operation,
            version: change.version,
            content_hash,
            payload,
        }
    }
}

/// Body of a push response.
///
/// Every change in the request appears in exactly one of the three lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    /// Changes the server stored, with their new server versions.
    #[serde(default)]
    pub accepted: Vec<AcceptedChange>,
    /// Changes rejected because the server holds a newer note.
    #[serde(default)]
    pub conflicts: Vec<ConflictedChange>,
    /// Changes that failed server-side.
    #[serde(default)]
    pub errors: Vec<RejectedChange>,
}

/// A change the server accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedChange {
    /// Note the verdict applies to.
    pub note_id: String,
    /// Version the server assigned to the stored change.
    pub server_version: i64,
}

/// A change the server rejected because its copy is newer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictedChange {
    /// Note the verdict applies to.
    pub note_id: String,
    /// The server's current copy, absent when the server deleted the note.
    #[serde(default)]
    pub server_note: Option<Note>,
    /// The server's current version.
    pub server_version: i64,
}

/// A change that failed server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedChange {
    /// Note the verdict applies to.
    pub note_id: String,
    /// Server-reported reason.
    pub error: String,
    /// Whether the server considers the failure transient.
    #[serde(default)]
    pub retryable: bool,
}

// ==================== Pull ====================

/// Body of `POST /v1/sync/pull`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Device requesting changes.
    pub device_id: String,
    /// Sequence cursor from the previous pull, 0 on first sync.
    pub since_sequence: i64,
}

/// Body of a pull response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Remote changes after the cursor, in server sequence order.
    #[serde(default)]
    pub changes: Vec<RemoteChange>,
    /// Cursor to resume from on the next pull.
    #[serde(default)]
    pub latest_sequence: i64,
}

/// One remote change in a pull response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChange {
    /// Note the change applies to.
    pub note_id: String,
    /// What happened to the note.
    pub operation: ChangeOperation,
    /// Server version of the change.
    pub version: i64,
    /// The note at that version; absent for deletes.
    #[serde(default)]
    pub note: Option<Note>,
}

// ==================== Status ====================

/// Body of `GET /v1/sync/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Whether the server is accepting sync traffic.
    pub ok: bool,
    /// Server wall clock, useful for spotting client clock skew.
    pub server_time: DateTime<Utc>,
}
