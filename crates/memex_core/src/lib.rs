//! # `memex_core`
//!
//! Core sync data model for Memex, the local-first note-taking app.
//!
//! This crate is the local half of the multi-device synchronization
//! engine: the note payload and its deterministic content hash, the
//! coalesced change queue and per-note sync state, the change store
//! contract with in-memory and SQLite implementations, and the two
//! local-side components ([`ChangeTracker`] and [`ConflictResolver`]).
//!
//! The network half (wire protocol, HTTP transport, sync coordinator)
//! lives in `memex_sync`.

#![warn(missing_docs)]

pub mod error;
pub mod hash;
pub mod note;
pub mod resolver;
pub mod store;
pub mod tracker;
pub mod types;

mod memory_store;
#[cfg(feature = "sqlite")]
mod sqlite_store;

pub use error::{MemexError, Result};
pub use hash::content_hash;
pub use memory_store::MemoryStore;
pub use note::Note;
pub use resolver::ConflictResolver;
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteStore;
pub use store::{StoreResult, SyncStore};
pub use tracker::ChangeTracker;
pub use types::{
    ChangeOperation, Conflict, ConflictReason, ConflictResolution, QueuedChange, SyncState,
    SyncStatus,
};
