//! Local change tracking and coalescing.
//!
//! [`ChangeTracker`] observes local note mutations and maintains the
//! coalesced push queue plus per-note sync state. It has no network or UI
//! side effects; everything it does lands in the [`SyncStore`].

use crate::hash::content_hash;
use crate::note::Note;
use crate::store::{StoreResult, SyncStore};
use crate::types::{ChangeOperation, QueuedChange, SyncState, SyncStatus};
use std::sync::Arc;

/// Tracks local note mutations into the change queue.
///
/// At most one queued entry exists per note: re-tracking replaces the
/// entry (the latest operation wins). Redundant updates, meaning a save
/// whose content hash equals the already-tracked hash, are dropped
/// entirely so autosave churn neither bumps versions nor grows the queue.
pub struct ChangeTracker {
    store: Arc<dyn SyncStore>,
}

impl ChangeTracker {
    /// Create a tracker backed by the given store.
    pub fn new(store: Arc<dyn SyncStore>) -> Self {
        Self { store }
    }

    /// Record a local create or update for push.
    ///
    /// Returns `true` if a change was queued, `false` for a redundant
    /// update whose content hash is unchanged. Passing
    /// [`ChangeOperation::Delete`] delegates to
    /// [`track_delete`](Self::track_delete).
    pub fn track_change(&self, note: &Note, operation: ChangeOperation) -> StoreResult<bool> {
        if operation == ChangeOperation::Delete {
            return self.track_delete(&note.id);
        }

        let new_hash = content_hash(note);
        let previous = self.store.get_sync_state(&note.id)?;

        if operation == ChangeOperation::Update
            && let Some(state) = &previous
            && state.content_hash == new_hash
        {
            log::debug!(
                "[ChangeTracker] Skipping redundant update for note {} (hash unchanged)",
                note.id
            );
            return Ok(false);
        }

        let (local_version, server_version, last_synced_at) = match &previous {
            Some(state) => (
                state.local_version + 1,
                state.server_version,
                state.last_synced_at,
            ),
            None => (1, None, None),
        };

        self.store.put_queued_change(QueuedChange::new(
            &note.id,
            operation,
            local_version,
            Some(note.clone()),
        ))?;
        self.store.set_sync_state(
            &note.id,
            SyncState {
                local_version,
                server_version,
                content_hash: new_hash,
                status: SyncStatus::Pending,
                last_synced_at,
            },
        )?;

        log::debug!(
            "[ChangeTracker] Tracked {} for note {} (v{})",
            operation,
            note.id,
            local_version
        );
        Ok(true)
    }

    /// Record a local delete for push.
    ///
    /// Also works for notes with no prior sync state: the tombstone is
    /// tracked at version 1 so the server still learns about the delete.
    /// Replaces any pending create/update for the same note.
    pub fn track_delete(&self, note_id: &str) -> StoreResult<bool> {
        let previous = self.store.get_sync_state(note_id)?;
        let (local_version, server_version, last_synced_at) = match &previous {
            Some(state) => (
                state.local_version + 1,
                state.server_version,
                state.last_synced_at,
            ),
            None => (1, None, None),
        };

        self.store.put_queued_change(QueuedChange::new(
            note_id,
            ChangeOperation::Delete,
            local_version,
            None,
        ))?;
        self.store.set_sync_state(
            note_id,
            SyncState {
                local_version,
                server_version,
                content_hash: String::new(),
                status: SyncStatus::Pending,
                last_synced_at,
            },
        )?;

        log::debug!(
            "[ChangeTracker] Tracked delete for note {} (v{})",
            note_id,
            local_version
        );
        Ok(true)
    }

    /// Mark a note acknowledged by the server at `server_version`.
    ///
    /// Sets status to synced and stamps `last_synced_at`; `local_version`
    /// and the content hash stay untouched. If the server acknowledges a
    /// version above the local counter (another device raced ahead), the
    /// counter is lifted to match so `local_version >= server_version`
    /// keeps holding. Silently a no-op for untracked notes.
    pub fn mark_synced(&self, note_id: &str, server_version: i64) -> StoreResult<()> {
        let Some(mut state) = self.store.get_sync_state(note_id)? else {
            log::debug!(
                "[ChangeTracker] Ignoring mark_synced for untracked note {}",
                note_id
            );
            return Ok(());
        };

        state.local_version = state.local_version.max(server_version);
        state.server_version = Some(server_version);
        state.status = SyncStatus::Synced;
        state.last_synced_at = Some(chrono::Utc::now().timestamp_millis());
        self.store.set_sync_state(note_id, state)?;

        log::debug!(
            "[ChangeTracker] Marked note {} synced at server v{}",
            note_id,
            server_version
        );
        Ok(())
    }

    /// Whether any changes await push.
    pub fn has_pending_changes(&self) -> StoreResult<bool> {
        Ok(self.store.queued_change_count()? > 0)
    }

    /// Number of distinct notes with queued changes.
    pub fn pending_change_count(&self) -> StoreResult<usize> {
        self.store.queued_change_count()
    }
}
