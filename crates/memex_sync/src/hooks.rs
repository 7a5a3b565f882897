//! Host application callbacks for applying remote changes.

use async_trait::async_trait;
use memex_core::Note;

/// Document-store callbacks supplied by the host application.
///
/// The engine never owns the note store. During the pull phase the
/// coordinator applies remote changes through [`save_note`] and
/// [`delete_note`], and reads the current local copy through
/// [`read_note`] when checking for conflicts. Errors are isolated per
/// note: one failing callback is reported in the cycle's error list and
/// the remaining changes still apply.
///
/// [`save_note`]: NoteHooks::save_note
/// [`delete_note`]: NoteHooks::delete_note
/// [`read_note`]: NoteHooks::read_note
#[async_trait]
pub trait NoteHooks: Send + Sync {
    /// Persist a note that arrived from the server (create or update).
    async fn save_note(&self, note: &Note) -> memex_core::Result<()>;

    /// Remove a note the server deleted. Deleting a note that does not
    /// exist locally must succeed.
    async fn delete_note(&self, note_id: &str) -> memex_core::Result<()>;

    /// Read the current local note, `None` when it does not exist.
    async fn read_note(&self, note_id: &str) -> memex_core::Result<Option<Note>>;
}
