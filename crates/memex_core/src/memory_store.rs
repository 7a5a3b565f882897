//! In-memory change store.

use crate::store::{StoreResult, SyncStore};
use crate::types::{QueuedChange, SyncState};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory [`SyncStore`] used in tests and short-lived embeddings.
///
/// The queue is an insertion-ordered map, so replacing a note's entry
/// keeps its original position and `get_queued_changes` returns
/// first-tracked order, matching the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
    queue: RwLock<IndexMap<String, QueuedChange>>,
    states: RwLock<HashMap<String, SyncState>>,
    last_sequence: RwLock<i64>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SyncStore for MemoryStore {
    fn put_queued_change(&self, change: QueuedChange) -> StoreResult<()> {
        let mut queue = self.queue.write().unwrap();
        let mut change = change;
        if let Some(existing) = queue.get(&change.note_id) {
            change.queued_at = existing.queued_at;
        }
        // IndexMap::insert keeps the original slot for an existing key.
        queue.insert(change.note_id.clone(), change);
        Ok(())
    }

    fn get_queued_change(&self, note_id: &str) -> StoreResult<Option<QueuedChange>> {
        Ok(self.queue.read().unwrap().get(note_id).cloned())
    }

    fn get_queued_changes(&self) -> StoreResult<Vec<QueuedChange>> {
        Ok(self.queue.read().unwrap().values().cloned().collect())
    }

    fn remove_queued_change(&self, note_id: &str) -> StoreResult<()> {
        self.queue.write().unwrap().shift_remove(note_id);
        Ok(())
    }

    fn mark_change_attempted(&self, note_id: &str, error: &str) -> StoreResult<()> {
        if let Some(change) = self.queue.write().unwrap().get_mut(note_id) {
            change.attempts += 1;
            change.last_error = Some(error.to_string());
        }
        Ok(())
    }

    fn queued_change_count(&self) -> StoreResult<usize> {
        Ok(self.queue.read().unwrap().len())
    }

    fn get_sync_state(&self, note_id: &str) -> StoreResult<Option<SyncState>> {
        Ok(self.states.read().unwrap().get(note_id).cloned())
    }

    fn set_sync_state(&self, note_id: &str, state: SyncState) -> StoreResult<()> {
        self.states
            .write()
            .unwrap()
            .insert(note_id.to_string(), state);
        Ok(())
    }

    fn delete_sync_state(&self, note_id: &str) -> StoreResult<()> {
        self.states.write().unwrap().remove(note_id);
        Ok(())
    }

    fn get_last_sync_sequence(&self) -> StoreResult<i64> {
        Ok(*self.last_sequence.read().unwrap())
    }

    fn set_last_sync_sequence(&self, sequence: i64) -> StoreResult<()> {
        *self.last_sequence.write().unwrap() = sequence;
        Ok(())
    }
}
