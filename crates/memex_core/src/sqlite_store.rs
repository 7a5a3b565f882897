//! SQLite-backed change store.

use crate::error::MemexError;
use crate::note::Note;
use crate::store::{StoreResult, SyncStore};
use crate::types::{ChangeOperation, QueuedChange, SyncState, SyncStatus};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

/// Converts rusqlite errors into [`MemexError::Database`], keeping rusqlite
/// out of the crate's public error surface.
trait SqliteResultExt<T> {
    fn db_err(self) -> StoreResult<T>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn db_err(self) -> StoreResult<T> {
        self.map_err(|e| MemexError::Database(e.to_string()))
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS queued_changes (
    note_id    TEXT PRIMARY KEY,
    operation  TEXT NOT NULL,
    version    INTEGER NOT NULL,
    payload    TEXT,
    last_error TEXT,
    attempts   INTEGER NOT NULL DEFAULT 0,
    queued_at  INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS sync_state (
    note_id        TEXT PRIMARY KEY,
    local_version  INTEGER NOT NULL,
    server_version INTEGER,
    content_hash   TEXT NOT NULL,
    status         TEXT NOT NULL,
    last_synced_at INTEGER
);
CREATE TABLE IF NOT EXISTS sync_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const LAST_SEQUENCE_KEY: &str = "last_sync_sequence";

/// SQLite-backed [`SyncStore`], one database per device.
///
/// Note payloads are stored as JSON text; the queue table is keyed by
/// `note_id` so coalescing falls out of the schema, and the upsert keeps
/// `rowid`/`queued_at` so push order stays first-tracked order.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path).db_err()?;
        Self::init(conn)
    }

    /// Open an ephemeral in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().db_err()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA).db_err()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Raw queue row before operation and payload parsing.
struct RawChange {
    note_id: String,
    operation: String,
    version: i64,
    payload: Option<String>,
    last_error: Option<String>,
    attempts: i64,
    queued_at: i64,
}

impl RawChange {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            note_id: row.get(0)?,
            operation: row.get(1)?,
            version: row.get(2)?,
            payload: row.get(3)?,
            last_error: row.get(4)?,
            attempts: row.get(5)?,
            queued_at: row.get(6)?,
        })
    }

    fn into_change(self) -> StoreResult<QueuedChange> {
        let operation = self
            .operation
            .parse::<ChangeOperation>()
            .map_err(MemexError::InvalidData)?;
        let payload = match self.payload {
            Some(raw) => Some(serde_json::from_str::<Note>(&raw)?),
            None => None,
        };
        Ok(QueuedChange {
            note_id: self.note_id,
            operation,
            version: self.version,
            payload,
            last_error: self.last_error,
            attempts: self.attempts as u32,
            queued_at: self.queued_at,
        })
    }
}

impl SyncStore for SqliteStore {
    fn put_queued_change(&self, change: QueuedChange) -> StoreResult<()> {
        let payload = change
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conn = self.conn.lock().unwrap();
        // queued_at is deliberately not updated on conflict, and DO UPDATE
        // keeps the rowid, so replacement preserves queue order.
        conn.execute(
            "INSERT INTO queued_changes
                 (note_id, operation, version, payload, last_error, attempts, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(note_id) DO UPDATE SET
                 operation = excluded.operation,
                 version = excluded.version,
                 payload = excluded.payload,
                 last_error = excluded.last_error,
                 attempts = excluded.attempts",
            params![
                change.note_id,
                change.operation.to_string(),
                change.version,
                payload,
                change.last_error,
                change.attempts as i64,
                change.queued_at,
            ],
        )
        .db_err()?;
        Ok(())
    }

    fn get_queued_change(&self, note_id: &str) -> StoreResult<Option<QueuedChange>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT note_id, operation, version, payload, last_error, attempts, queued_at
                 FROM queued_changes WHERE note_id = ?1",
                params![note_id],
                RawChange::from_row,
            )
            .optional()
            .db_err()?;
        raw.map(RawChange::into_change).transpose()
    }

    fn get_queued_changes(&self) -> StoreResult<Vec<QueuedChange>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT note_id, operation, version, payload, last_error, attempts, queued_at
                 FROM queued_changes ORDER BY rowid ASC",
            )
            .db_err()?;
        let rows = stmt
            .query_map([], RawChange::from_row)
            .db_err()?
            .collect::<rusqlite::Result<Vec<_>>>()
            .db_err()?;
        rows.into_iter().map(RawChange::into_change).collect()
    }

    fn remove_queued_change(&self, note_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM queued_changes WHERE note_id = ?1",
            params![note_id],
        )
        .db_err()?;
        Ok(())
    }

    fn mark_change_attempted(&self, note_id: &str, error: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE queued_changes SET attempts = attempts + 1, last_error = ?2
             WHERE note_id = ?1",
            params![note_id, error],
        )
        .db_err()?;
        Ok(())
    }

    fn queued_change_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM queued_changes", [], |row| row.get(0))
            .db_err()?;
        Ok(count as usize)
    }

    fn get_sync_state(&self, note_id: &str) -> StoreResult<Option<SyncState>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT local_version, server_version, content_hash, status, last_synced_at
                 FROM sync_state WHERE note_id = ?1",
                params![note_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()
            .db_err()?;

        raw.map(
            |(local_version, server_version, content_hash, status, last_synced_at)| {
                Ok(SyncState {
                    local_version,
                    server_version,
                    content_hash,
                    status: status
                        .parse::<SyncStatus>()
                        .map_err(MemexError::InvalidData)?,
                    last_synced_at,
                })
            },
        )
        .transpose()
    }

    fn set_sync_state(&self, note_id: &str, state: SyncState) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO sync_state
                 (note_id, local_version, server_version, content_hash, status, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                note_id,
                state.local_version,
                state.server_version,
                state.content_hash,
                state.status.to_string(),
                state.last_synced_at,
            ],
        )
        .db_err()?;
        Ok(())
    }

    fn delete_sync_state(&self, note_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sync_state WHERE note_id = ?1", params![note_id])
            .db_err()?;
        Ok(())
    }

    fn get_last_sync_sequence(&self) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                params![LAST_SEQUENCE_KEY],
                |row| row.get(0),
            )
            .optional()
            .db_err()?;
        match value {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|e| MemexError::InvalidData(format!("bad sync cursor: {}", e))),
            None => Ok(0),
        }
    }

    fn set_last_sync_sequence(&self, sequence: i64) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
            params![LAST_SEQUENCE_KEY, sequence.to_string()],
        )
        .db_err()?;
        Ok(())
    }
}
