//! Conflict detection and bookkeeping.
//!
//! [`ConflictResolver`] decides whether a local/remote divergence is a
//! true conflict and records it for user resolution. It never resolves
//! anything itself; the host application applies a
//! [`ConflictResolution`](crate::ConflictResolution) of its choosing and
//! clears the record.

use crate::hash::content_hash;
use crate::note::Note;
use crate::store::{StoreResult, SyncStore};
use crate::types::{Conflict, ConflictReason};
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

/// Detects and records divergences between pending local changes and
/// newer remote ones.
///
/// Records live in memory, keyed by note id, so re-detecting the same
/// divergence updates the existing record instead of duplicating it.
/// They do not survive a restart; the next sync cycle re-detects any
/// divergence that still exists.
pub struct ConflictResolver {
    store: Arc<dyn SyncStore>,
    conflicts: RwLock<IndexMap<String, Conflict>>,
}

impl ConflictResolver {
    /// Create a resolver backed by the given store.
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self {
            store,
            conflicts: RwLock::new(IndexMap::new()),
        }
    }

    /// Decide whether a remote change for `note_id` conflicts with local
    /// state.
    ///
    /// True exactly when all three hold:
    /// 1. the note has sync state with a pending (unacknowledged) change,
    /// 2. `remote_version` is newer than the last server version this
    ///    device observed (`0` when the note was never pushed),
    /// 3. the content hashes differ. An absent note hashes to `""`, so
    ///    concurrent deletes of the same note are not conflicts, and
    ///    concurrent edits that landed on identical content are not
    ///    conflicts either.
    pub fn has_conflict(
        &self,
        note_id: &str,
        local_note: Option<&Note>,
        remote_note: Option<&Note>,
        remote_version: i64,
    ) -> StoreResult<bool> {
        let Some(state) = self.store.get_sync_state(note_id)? else {
            return Ok(false);
        };
        if !state.is_pending() {
            return Ok(false);
        }
        if remote_version <= state.server_version.unwrap_or(0) {
            return Ok(false);
        }

        let local_hash = local_note.map(content_hash).unwrap_or_default();
        let remote_hash = remote_note.map(content_hash).unwrap_or_default();
        Ok(local_hash != remote_hash)
    }

    /// Register a conflict for later resolution.
    ///
    /// Idempotent per note id: re-detecting the same divergence replaces
    /// the record and refreshes `detected_at` rather than duplicating it.
    pub fn detect_conflict(
        &self,
        note_id: &str,
        local_note: Option<Note>,
        remote_note: Option<Note>,
        local_version: i64,
        remote_version: i64,
        reason: ConflictReason,
    ) {
        let conflict = Conflict {
            note_id: note_id.to_string(),
            local_note,
            remote_note,
            local_version,
            remote_version,
            reason,
            detected_at: chrono::Utc::now().timestamp_millis(),
        };

        let mut conflicts = self.conflicts.write().unwrap();
        let replaced = conflicts.insert(note_id.to_string(), conflict).is_some();
        drop(conflicts);

        if replaced {
            log::debug!(
                "[ConflictResolver] Refreshed {} conflict for note {} (remote v{})",
                reason,
                note_id,
                remote_version
            );
        } else {
            log::info!(
                "[ConflictResolver] Recorded {} conflict for note {} (local v{}, remote v{})",
                reason,
                note_id,
                local_version,
                remote_version
            );
        }
    }

    /// Number of unresolved conflicts.
    pub fn conflict_count(&self) -> usize {
        self.conflicts.read().unwrap().len()
    }

    /// Snapshot of unresolved conflicts in detection order.
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.conflicts.read().unwrap().values().cloned().collect()
    }

    /// Look up the conflict recorded for a note, if any.
    pub fn get_conflict(&self, note_id: &str) -> Option<Conflict> {
        self.conflicts.read().unwrap().get(note_id).cloned()
    }

    /// Remove and return a conflict record.
    ///
    /// Hosts call this once they have applied a resolution for the note.
    pub fn take_conflict(&self, note_id: &str) -> Option<Conflict> {
        self.conflicts.write().unwrap().shift_remove(note_id)
    }

    /// Drop all conflict records.
    pub fn clear(&self) {
        self.conflicts.write().unwrap().clear();
    }
}
