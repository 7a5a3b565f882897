//! Local change store contract.
//!
//! The engine persists all of its bookkeeping (the coalesced change queue,
//! per-note sync state, and the global pull cursor) through this trait.
//! Two implementations ship with the crate: [`MemoryStore`] for tests and
//! ephemeral embedding, and [`SqliteStore`] for durable storage.
//!
//! [`MemoryStore`]: crate::MemoryStore
//! [`SqliteStore`]: crate::SqliteStore

use crate::error::MemexError;
use crate::types::{QueuedChange, SyncState};

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, MemexError>;

/// Durable storage contract for the engine's bookkeeping.
///
/// The queue is keyed by note id: at most one entry per note, and
/// replacing an entry must not move it, so the push order stays
/// first-tracked order regardless of how often a note is re-edited.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine shares one store
/// across the tracker, resolver, and coordinator as `Arc<dyn SyncStore>`.
/// Each method must apply its mutation atomically with respect to the
/// other methods for the same note.
pub trait SyncStore: Send + Sync {
    /// Insert or replace the queued change for a note.
    ///
    /// Replacement keeps the entry's queue position and its original
    /// `queued_at`, so "first tracked" survives coalescing.
    fn put_queued_change(&self, change: QueuedChange) -> StoreResult<()>;

    /// Get the queued change for a note, if any.
    fn get_queued_change(&self, note_id: &str) -> StoreResult<Option<QueuedChange>>;

    /// Snapshot all queued changes in first-tracked order.
    fn get_queued_changes(&self) -> StoreResult<Vec<QueuedChange>>;

    /// Remove the queued change for a note. No-op if absent.
    fn remove_queued_change(&self, note_id: &str) -> StoreResult<()>;

    /// Record a failed push attempt against a queued change: increments
    /// the attempt count and stores the error message. No-op if absent.
    fn mark_change_attempted(&self, note_id: &str, error: &str) -> StoreResult<()>;

    /// Number of queued changes (equals the number of dirty notes).
    fn queued_change_count(&self) -> StoreResult<usize>;

    /// Get the sync state for a note.
    fn get_sync_state(&self, note_id: &str) -> StoreResult<Option<SyncState>>;

    /// Insert or replace the sync state for a note.
    fn set_sync_state(&self, note_id: &str, state: SyncState) -> StoreResult<()>;

    /// Delete the sync state for a note. No-op if absent.
    fn delete_sync_state(&self, note_id: &str) -> StoreResult<()>;

    /// The pull cursor: highest server sequence this device has consumed,
    /// `0` when the device has never pulled.
    fn get_last_sync_sequence(&self) -> StoreResult<i64>;

    /// Persist the pull cursor.
    fn set_last_sync_sequence(&self, sequence: i64) -> StoreResult<()>;
}
