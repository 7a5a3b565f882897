//! Error types for the Memex sync core.

use thiserror::Error;

/// Errors produced by the core data model and change stores.
#[derive(Debug, Error)]
pub enum MemexError {
    /// Local change store failed (backend-agnostic).
    #[error("store error: {0}")]
    Store(String),

    /// SQLite-level failure in the durable store.
    #[error("database error: {0}")]
    Database(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be interpreted (corrupt row, unknown tag).
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MemexError>;
