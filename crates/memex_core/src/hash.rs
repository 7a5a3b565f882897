//! Deterministic content hashing for change detection.
//!
//! The content hash is the engine's definition of "did this note really
//! change": redundant saves and timestamp-only updates produce the same
//! hash and are coalesced away, while any edit to a semantic field
//! produces a new one. Both sides of the sync protocol compute it the
//! same way, so hashes are comparable across devices.

use crate::note::Note;
use sha2::{Digest, Sha256};

/// Compute the content hash of a note as lowercase hex SHA-256.
///
/// The hash covers only the semantic fields (title, content, tags,
/// metadata); id and timestamps are excluded so bookkeeping changes never
/// look like edits. Every field is length-delimited and the collections
/// are count-prefixed, so adjacent values cannot collide.
///
/// The hash of an *absent* payload (a deleted note) is the empty string
/// by convention; see `SyncState::content_hash`.
pub fn content_hash(note: &Note) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, &note.title);
    update_field(&mut hasher, &note.content);

    hasher.update((note.tags.len() as u64).to_le_bytes());
    for tag in &note.tags {
        update_field(&mut hasher, tag);
    }

    hasher.update((note.metadata.len() as u64).to_le_bytes());
    for (key, value) in &note.metadata {
        update_field(&mut hasher, key);
        // serde_json::Value trees always serialize; skip is unreachable
        // in practice but keeps this function infallible.
        if let Ok(raw) = serde_json::to_string(value) {
            update_field(&mut hasher, &raw);
        }
    }

    to_hex(&hasher.finalize())
}

fn update_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_note() -> Note {
        Note::new("n1", "Title")
            .with_content("body text")
            .with_tags(vec!["work".to_string(), "urgent".to_string()])
    }

    #[test]
    fn test_hash_is_stable() {
        let note = create_test_note();
        assert_eq!(content_hash(&note), content_hash(&note));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = content_hash(&create_test_note());
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash.to_lowercase());
    }

    #[test]
    fn test_hash_ignores_id_and_timestamps() {
        let a = create_test_note();
        let mut b = a.clone();
        b.id = "other".to_string();
        b.created_at = 1;
        b.updated_at = 2;
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_hash_changes_on_content_edit() {
        let a = create_test_note();
        let b = a.clone().with_content("different body");
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_hash_changes_on_tag_change() {
        let a = create_test_note();
        let mut b = a.clone();
        b.tags.push("extra".to_string());
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_hash_sensitive_to_tag_order() {
        let a = Note::new("n1", "T").with_tags(vec!["a".to_string(), "b".to_string()]);
        let b = Note::new("n1", "T").with_tags(vec!["b".to_string(), "a".to_string()]);
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_hash_independent_of_metadata_insertion_order() {
        let a = Note::new("n1", "T")
            .with_metadata("alpha", serde_json::json!(1))
            .with_metadata("beta", serde_json::json!(2));
        let b = Note::new("n1", "T")
            .with_metadata("beta", serde_json::json!(2))
            .with_metadata("alpha", serde_json::json!(1));
        assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_tag_and_metadata_sections_do_not_collide() {
        let tagged = Note::new("n1", "T").with_tags(vec!["k".to_string()]);
        let keyed = Note::new("n1", "T").with_metadata("k", serde_json::json!("v"));
        assert_ne!(content_hash(&tagged), content_hash(&keyed));
    }

    #[test]
    fn test_hash_agrees_with_content_equality() {
        let a = create_test_note();
        let mut b = a.clone();
        b.updated_at += 1000;
        assert!(a.is_content_equal(&b));
        assert_eq!(content_hash(&a), content_hash(&b));

        let c = a.clone().with_content("edited");
        assert!(!a.is_content_equal(&c));
        assert_ne!(content_hash(&a), content_hash(&c));
    }
}
