//! # Memex Sync Engine
//!
//! Network half of the Memex multi-device note synchronization engine.
//!
//! This crate provides:
//! - **Protocol types** ([`protocol`]): JSON bodies for the push, pull
//!   and status endpoints
//! - **Transport** ([`SyncTransport`], [`HttpTransport`]): reqwest-backed
//!   client with exponential backoff, rate-limit handling and cancellable
//!   retry waits
//! - **Hooks** ([`NoteHooks`]): callbacks into the host's document store
//! - **Coordinator** ([`SyncCoordinator`]): push-then-pull cycles that
//!   track progress, isolate per-note failures and route divergent
//!   changes to the conflict resolver
//!
//! The local half (notes, content hashing, change tracking, conflict
//! records and the change stores) lives in `memex_core`.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod http_transport;
pub mod protocol;
pub mod retry;
pub mod transport;

pub use config::SyncConfig;
pub use coordinator::{ProgressCallback, SyncCoordinator, SyncPhase, SyncProgress, SyncReport};
pub use error::{Result, SyncError};
pub use hooks::NoteHooks;
pub use http_transport::HttpTransport;
pub use retry::RetryPolicy;
pub use transport::SyncTransport;
