//! Core bookkeeping types for the synchronization engine.
//!
//! This module defines the records the engine keeps per note: the queued
//! change awaiting push, the sync state tracking local/server versions,
//! and the conflict record produced when a pending local change collides
//! with a newer remote one.

use crate::note::Note;
use serde::{Deserialize, Serialize};

// ==================== Change Operations ====================

/// The kind of local mutation queued for push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    /// Note was created locally.
    Create,

    /// Note was edited locally.
    Update,

    /// Note was deleted locally.
    Delete,
}

impl std::fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOperation::Create => write!(f, "create"),
            ChangeOperation::Update => write!(f, "update"),
            ChangeOperation::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for ChangeOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeOperation::Create),
            "update" => Ok(ChangeOperation::Update),
            "delete" => Ok(ChangeOperation::Delete),
            _ => Err(format!("Unknown change operation: {}", s)),
        }
    }
}

// ==================== Queued Changes ====================

/// One pending local mutation, at most one per note.
///
/// The queue is coalesced: tracking a note that already has a queued entry
/// replaces the entry wholesale (the latest operation wins and retry
/// metadata resets) while keeping its queue position, so rapid edits to
/// the same note never pile up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedChange {
    /// Note this change belongs to.
    pub note_id: String,

    /// Latest requested operation (not accumulated history).
    pub operation: ChangeOperation,

    /// Local per-note version this change was tracked at.
    pub version: i64,

    /// Full note snapshot; `None` exactly for deletes.
    pub payload: Option<Note>,

    /// Last push error reported for this entry, if any.
    #[serde(default)]
    pub last_error: Option<String>,

    /// Number of failed push attempts recorded against this entry.
    #[serde(default)]
    pub attempts: u32,

    /// Unix timestamp (ms) when the note first entered the queue.
    pub queued_at: i64,
}

impl QueuedChange {
    /// Create a fresh queue entry with zeroed retry metadata.
    pub fn new(
        note_id: impl Into<String>,
        operation: ChangeOperation,
        version: i64,
        payload: Option<Note>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            operation,
            version,
            payload,
            last_error: None,
            attempts: 0,
            queued_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

// ==================== Sync State ====================

/// Acknowledgement status of a tracked note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local changes exist that the server has not acknowledged.
    Pending,

    /// The server has acknowledged everything tracked for this note.
    Synced,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Pending => write!(f, "pending"),
            SyncStatus::Synced => write!(f, "synced"),
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            _ => Err(format!("Unknown sync status: {}", s)),
        }
    }
}

/// Per-note sync bookkeeping, one record per note ever tracked locally.
///
/// Invariant: `local_version >= server_version` whenever the latter is
/// `Some`. A note absent from sync state has never been tracked. A pending
/// delete keeps its record with `content_hash = ""` until the server
/// acknowledges the deletion, at which point the record is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Monotonic local version, bumped on each effective local change.
    pub local_version: i64,

    /// Last version acknowledged by the server; `None` until the first
    /// successful push and preserved across subsequent local edits.
    pub server_version: Option<i64>,

    /// Content hash at the last tracked change (`""` for a pending delete).
    pub content_hash: String,

    /// Whether unacknowledged local changes exist.
    pub status: SyncStatus,

    /// Unix timestamp (ms) of the last acknowledgement, if any.
    pub last_synced_at: Option<i64>,
}

impl SyncState {
    /// True when unacknowledged local changes exist.
    pub fn is_pending(&self) -> bool {
        self.status == SyncStatus::Pending
    }
}

// ==================== Conflicts ====================

/// Why a divergence was classified as a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictReason {
    /// Both sides edited the note concurrently.
    Edit,

    /// One side deleted the note while the other edited it.
    DeleteEdit,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::Edit => write!(f, "edit"),
            ConflictReason::DeleteEdit => write!(f, "delete-edit"),
        }
    }
}

/// A detected divergence between a pending local change and a newer
/// remote change for the same note.
///
/// Conflicts persist until the host application resolves them; the engine
/// only records and surfaces them (see `ConflictResolver`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Note both sides touched.
    pub note_id: String,

    /// Local note at detection time; `None` when the local change is a delete.
    pub local_note: Option<Note>,

    /// Remote note; `None` when the remote operation is a delete.
    pub remote_note: Option<Note>,

    /// Local version at detection time.
    pub local_version: i64,

    /// Remote version that collided with it.
    pub remote_version: i64,

    /// Classification of the divergence.
    pub reason: ConflictReason,

    /// Unix timestamp (ms) when the conflict was last registered.
    pub detected_at: i64,
}

/// How the host application chose to resolve a conflict.
///
/// Applying the choice (overwriting one side, duplicating the note) is the
/// host's responsibility; the engine only shares the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Keep the local note and push it as the new authoritative version.
    KeepLocal,

    /// Discard local edits and take the remote note.
    KeepRemote,

    /// Keep both by duplicating the note under a new id.
    KeepBoth,
}

// ==================== Tests ====================
