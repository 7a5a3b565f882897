//! The note payload exchanged with the sync server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A full note snapshot as the sync engine sees it.
///
/// The engine treats notes as opaque payloads: it never interprets
/// `content`, it only hashes the semantic fields (title, content, tags,
/// metadata) to detect real changes. Timestamps and the id are excluded
/// from hashing so cosmetic or bookkeeping updates do not mark a note
/// dirty.
///
/// `metadata` is a `BTreeMap` so iteration order is stable, which keeps
/// the content hash deterministic across devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Stable note identifier (assigned by the document store).
    pub id: String,

    /// Display title.
    #[serde(default)]
    pub title: String,

    /// Note body.
    #[serde(default)]
    pub content: String,

    /// User-assigned tags, in display order.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Additional properties not covered by the other fields.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,

    /// Unix timestamp of creation (milliseconds).
    #[serde(default)]
    pub created_at: i64,

    /// Unix timestamp of last modification (milliseconds).
    #[serde(default)]
    pub updated_at: i64,
}

impl Note {
    /// Create a new note with the given id and title, timestamped now.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the body content, bumping `updated_at`.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self.updated_at = chrono::Utc::now().timestamp_millis();
        self
    }

    /// Set the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attach a metadata property.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Check if two notes are semantically equal (ignoring id and timestamps).
    ///
    /// This mirrors the content hash: two notes are content-equal exactly
    /// when their hashes match.
    pub fn is_content_equal(&self, other: &Self) -> bool {
        self.title == other.title
            && self.content == other.content
            && self.tags == other.tags
            && self.metadata == other.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_timestamps() {
        let note = Note::new("n1", "Groceries");
        assert_eq!(note.id, "n1");
        assert_eq!(note.title, "Groceries");
        assert!(note.created_at > 0);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn test_content_equal_ignores_id_and_timestamps() {
        let a = Note::new("n1", "Title").with_content("body");
        let mut b = Note::new("n2", "Title").with_content("body");
        b.created_at = 1;
        b.updated_at = 2;
        assert!(a.is_content_equal(&b));
    }

    #[test]
    fn test_content_equal_detects_tag_changes() {
        let a = Note::new("n1", "Title").with_tags(vec!["work".to_string()]);
        let b = Note::new("n1", "Title").with_tags(vec!["home".to_string()]);
        assert!(!a.is_content_equal(&b));
    }

    #[test]
    fn test_serde_round_trip() {
        let note = Note::new("n1", "Title")
            .with_content("body")
            .with_metadata("pinned", serde_json::json!(true));
        let json = serde_json::to_string(&note).unwrap();
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(note, back);
    }
}
