//! End-to-end sync cycle scenarios over an in-memory store, a scripted
//! transport and mock document-store hooks.

use async_trait::async_trait;
use chrono::Utc;
use memex_core::{
    ChangeOperation, ChangeTracker, ConflictReason, MemoryStore, Note, SyncState, SyncStatus,
    content_hash,
};
use memex_sync::protocol::{
    AcceptedChange, ConflictedChange, PullRequest, PullResponse, PushRequest, PushResponse,
    RejectedChange, RemoteChange, StatusResponse,
};
use memex_sync::{Result, SyncCoordinator, SyncError, SyncPhase, SyncTransport};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

// ==================== Test doubles ====================

/// Transport that replays scripted responses and records requests.
///
/// With no scripted response, push accepts nothing and pull returns an
/// empty batch at the request's own cursor.
#[derive(Default)]
struct ScriptedTransport {
    push_results: Mutex<VecDeque<Result<PushResponse>>>,
    pull_results: Mutex<VecDeque<Result<PullResponse>>>,
    push_requests: Mutex<Vec<PushRequest>>,
    pull_requests: Mutex<Vec<PullRequest>>,
    on_push: Mutex<Option<Box<dyn Fn(&PushRequest) + Send>>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self::default()
    }

    fn script_push(&self, result: Result<PushResponse>) {
        self.push_results.lock().unwrap().push_back(result);
    }

    fn script_pull(&self, result: Result<PullResponse>) {
        self.pull_results.lock().unwrap().push_back(result);
    }

    fn set_on_push(&self, callback: Box<dyn Fn(&PushRequest) + Send>) {
        *self.on_push.lock().unwrap() = Some(callback);
    }

    fn push_requests(&self) -> Vec<PushRequest> {
        self.push_requests.lock().unwrap().clone()
    }

    fn pull_requests(&self) -> Vec<PullRequest> {
        self.pull_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn push(&self, request: &PushRequest) -> Result<PushResponse> {
        self.push_requests.lock().unwrap().push(request.clone());
        if let Some(callback) = self.on_push.lock().unwrap().as_ref() {
            callback(request);
        }
        match self.push_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(PushResponse::default()),
        }
    }

    async fn pull(&self, request: &PullRequest) -> Result<PullResponse> {
        self.pull_requests.lock().unwrap().push(request.clone());
        match self.pull_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(PullResponse {
                changes: vec![],
                latest_sequence: request.since_sequence,
            }),
        }
    }

    async fn check_status(&self) -> Result<StatusResponse> {
        Ok(StatusResponse {
            ok: true,
            server_time: Utc::now(),
        })
    }
}

/// In-memory document store standing in for the host application.
#[derive(Default)]
struct MockHooks {
    notes: RwLock<HashMap<String, Note>>,
    deleted: RwLock<Vec<String>>,
    saves: AtomicUsize,
    fail_saves: RwLock<HashSet<String>>,
}

impl MockHooks {
    fn new() -> Self {
        Self::default()
    }

    fn seed(&self, note: Note) {
        self.notes.write().unwrap().insert(note.id.clone(), note);
    }

    fn note(&self, note_id: &str) -> Option<Note> {
        self.notes.read().unwrap().get(note_id).cloned()
    }

    fn deleted_ids(&self) -> Vec<String> {
        self.deleted.read().unwrap().clone()
    }

    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn fail_saves_for(&self, note_id: &str) {
        self.fail_saves.write().unwrap().insert(note_id.to_string());
    }
}

#[async_trait]
impl memex_sync::NoteHooks for MockHooks {
    async fn save_note(&self, note: &Note) -> memex_core::Result<()> {
        if self.fail_saves.read().unwrap().contains(&note.id) {
            return Err(memex_core::MemexError::Store(
                "simulated save failure".to_string(),
            ));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.notes
            .write()
            .unwrap()
            .insert(note.id.clone(), note.clone());
        Ok(())
    }

    async fn delete_note(&self, note_id: &str) -> memex_core::Result<()> {
        self.notes.write().unwrap().remove(note_id);
        self.deleted.write().unwrap().push(note_id.to_string());
        Ok(())
    }

    async fn read_note(&self, note_id: &str) -> memex_core::Result<Option<Note>> {
        Ok(self.notes.read().unwrap().get(note_id).cloned())
    }
}

fn setup() -> (
    Arc<MemoryStore>,
    Arc<ScriptedTransport>,
    Arc<MockHooks>,
    SyncCoordinator,
) {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(ScriptedTransport::new());
    let hooks = Arc::new(MockHooks::new());
    let coordinator =
        SyncCoordinator::new(store.clone(), transport.clone(), hooks.clone(), "device-a");
    (store, transport, hooks, coordinator)
}

fn accepted(note_id: &str, server_version: i64) -> PushResponse {
    PushResponse {
        accepted: vec![AcceptedChange {
            note_id: note_id.to_string(),
            server_version,
        }],
        ..PushResponse::default()
    }
}

fn synced_state(note: &Note, version: i64) -> SyncState {
    SyncState {
        local_version: version,
        server_version: Some(version),
        content_hash: content_hash(note),
        status: SyncStatus::Synced,
        last_synced_at: Some(0),
    }
}

// ==================== Push scenarios ====================

#[tokio::test]
async fn test_tracked_create_is_pushed_and_acknowledged() {
    let (store, transport, _hooks, coordinator) = setup();
    let note = Note::new("note-1", "Groceries").with_content("milk");
    coordinator
        .tracker()
        .track_change(&note, ChangeOperation::Create)
        .unwrap();

    transport.script_push(Ok(accepted("note-1", 1)));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pushed, 1);
    assert_eq!(report.pulled, 0);
    assert_eq!(report.conflicts, 0);
    assert!(!report.has_errors());

    let requests = transport.push_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].device_id, "device-a");
    let change = &requests[0].changes[0];
    assert_eq!(change.note_id, "note-1");
    assert_eq!(change.operation, ChangeOperation::Create);
    assert_eq!(change.version, 1);
    assert_eq!(
        change.content_hash.as_deref(),
        Some(content_hash(&note).as_str())
    );
    assert!(change.payload.is_some());

    use memex_core::SyncStore;
    assert_eq!(store.queued_change_count().unwrap(), 0);
    let state = store.get_sync_state("note-1").unwrap().unwrap();
    assert_eq!(state.local_version, 1);
    assert_eq!(state.server_version, Some(1));
    assert_eq!(state.status, SyncStatus::Synced);
    assert!(state.last_synced_at.is_some());
}

#[tokio::test]
async fn test_acknowledged_delete_clears_sync_state() {
    use memex_core::SyncStore;

    let (store, transport, _hooks, coordinator) = setup();
    let note = Note::new("note-1", "Scratch");
    coordinator
        .tracker()
        .track_change(&note, ChangeOperation::Create)
        .unwrap();
    transport.script_push(Ok(accepted("note-1", 1)));
    coordinator.run_sync_cycle().await.unwrap();

    coordinator.tracker().track_delete("note-1").unwrap();
    assert!(store.get_sync_state("note-1").unwrap().unwrap().is_pending());

    transport.script_push(Ok(accepted("note-1", 2)));
    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pushed, 1);

    let requests = transport.push_requests();
    let delete = &requests[1].changes[0];
    assert_eq!(delete.operation, ChangeOperation::Delete);
    assert_eq!(delete.version, 2);
    assert!(delete.payload.is_none());
    assert!(delete.content_hash.is_none());

    // The tombstone is fully gone once the server acknowledges it.
    assert_eq!(store.queued_change_count().unwrap(), 0);
    assert!(store.get_sync_state("note-1").unwrap().is_none());
}

#[tokio::test]
async fn test_push_conflict_keeps_change_queued() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    let local = Note::new("note-1", "Plan").with_content("local edit");
    hooks.seed(local.clone());
    coordinator
        .tracker()
        .track_change(&local, ChangeOperation::Update)
        .unwrap();

    let server_copy = Note::new("note-1", "Plan").with_content("server edit");
    let conflict_response = PushResponse {
        conflicts: vec![ConflictedChange {
            note_id: "note-1".to_string(),
            server_note: Some(server_copy.clone()),
            server_version: 5,
        }],
        ..PushResponse::default()
    };
    transport.script_push(Ok(conflict_response.clone()));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pushed, 0);
    assert_eq!(report.conflicts, 1);
    assert!(report.has_errors());
    assert_eq!(store.queued_change_count().unwrap(), 1);

    let resolver = coordinator.resolver();
    let conflict = resolver.get_conflict("note-1").unwrap();
    assert_eq!(conflict.reason, ConflictReason::Edit);
    assert_eq!(conflict.local_version, 1);
    assert_eq!(conflict.remote_version, 5);
    assert_eq!(conflict.local_note.as_ref().unwrap().content, "local edit");
    assert_eq!(conflict.remote_note.as_ref().unwrap().content, "server edit");

    // A second cycle re-detecting the same divergence refreshes the
    // record instead of duplicating it.
    transport.script_push(Ok(conflict_response));
    coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(resolver.conflict_count(), 1);
}

#[tokio::test]
async fn test_retryable_rejection_records_attempt() {
    use memex_core::SyncStore;

    let (store, transport, _hooks, coordinator) = setup();
    coordinator
        .tracker()
        .track_change(&Note::new("note-1", "Draft"), ChangeOperation::Create)
        .unwrap();
    transport.script_push(Ok(PushResponse {
        errors: vec![RejectedChange {
            note_id: "note-1".to_string(),
            error: "storage busy".to_string(),
            retryable: true,
        }],
        ..PushResponse::default()
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pushed, 0);
    assert!(report.errors.iter().any(|e| e.contains("storage busy")));

    let queued = store.get_queued_change("note-1").unwrap().unwrap();
    assert_eq!(queued.attempts, 1);
    assert_eq!(queued.last_error.as_deref(), Some("storage busy"));
}

#[tokio::test]
async fn test_non_retryable_rejection_leaves_attempts_untouched() {
    use memex_core::SyncStore;

    let (store, transport, _hooks, coordinator) = setup();
    coordinator
        .tracker()
        .track_change(&Note::new("note-1", "Draft"), ChangeOperation::Create)
        .unwrap();
    transport.script_push(Ok(PushResponse {
        errors: vec![RejectedChange {
            note_id: "note-1".to_string(),
            error: "payload too large".to_string(),
            retryable: false,
        }],
        ..PushResponse::default()
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert!(report.errors.iter().any(|e| e.contains("payload too large")));

    // Still queued so the user can shrink it and retry, but no attempt
    // bookkeeping for a failure the server called permanent.
    let queued = store.get_queued_change("note-1").unwrap().unwrap();
    assert_eq!(queued.attempts, 0);
    assert!(queued.last_error.is_none());
}

#[tokio::test]
async fn test_transport_failure_aborts_cycle() {
    use memex_core::SyncStore;

    let (store, transport, _hooks, coordinator) = setup();
    coordinator
        .tracker()
        .track_change(&Note::new("note-1", "Draft"), ChangeOperation::Create)
        .unwrap();
    transport.script_push(Err(SyncError::ServerError { status: 503 }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pushed, 0);
    assert!(report.errors.iter().any(|e| e.contains("push failed")));
    assert_eq!(store.queued_change_count().unwrap(), 1);
    // Pull is skipped when push aborts.
    assert!(transport.pull_requests().is_empty());
    assert_eq!(coordinator.current_phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_failed_push_succeeds_next_cycle() {
    use memex_core::SyncStore;

    let (store, transport, _hooks, coordinator) = setup();
    coordinator
        .tracker()
        .track_change(&Note::new("note-1", "Draft"), ChangeOperation::Create)
        .unwrap();

    transport.script_push(Err(SyncError::ServerError { status: 502 }));
    let first = coordinator.run_sync_cycle().await.unwrap();
    assert!(first.has_errors());

    transport.script_push(Ok(accepted("note-1", 1)));
    let second = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(second.pushed, 1);
    assert!(!second.has_errors());
    assert_eq!(store.queued_change_count().unwrap(), 0);
}

#[tokio::test]
async fn test_change_tracked_during_push_survives_acknowledgement() {
    use memex_core::SyncStore;

    let (store, transport, _hooks, coordinator) = setup();
    let note = Note::new("note-1", "Plan").with_content("first content");
    coordinator
        .tracker()
        .track_change(&note, ChangeOperation::Create)
        .unwrap();

    // The user edits the note while the push request is in flight.
    let tracker = ChangeTracker::new(store.clone());
    let edited = note.clone().with_content("second content");
    transport.set_on_push(Box::new(move |_request| {
        tracker
            .track_change(&edited, ChangeOperation::Update)
            .unwrap();
    }));
    transport.script_push(Ok(accepted("note-1", 1)));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pushed, 1);

    // The acknowledgement covered v1 only; the newer edit stays queued.
    let queued = store.get_queued_change("note-1").unwrap().unwrap();
    assert_eq!(queued.version, 2);
    let state = store.get_sync_state("note-1").unwrap().unwrap();
    assert_eq!(state.status, SyncStatus::Pending);
    assert_eq!(state.local_version, 2);
    assert_eq!(state.server_version, Some(1));
}

// ==================== Pull scenarios ====================

#[tokio::test]
async fn test_pull_applies_remote_create() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    let remote = Note::new("note-9", "From device B").with_content("hello");
    transport.script_pull(Ok(PullResponse {
        changes: vec![RemoteChange {
            note_id: "note-9".to_string(),
            operation: ChangeOperation::Create,
            version: 3,
            note: Some(remote.clone()),
        }],
        latest_sequence: 12,
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pulled, 1);
    assert!(!report.has_errors());

    assert_eq!(hooks.note("note-9").unwrap().content, "hello");
    let state = store.get_sync_state("note-9").unwrap().unwrap();
    assert_eq!(state.local_version, 3);
    assert_eq!(state.server_version, Some(3));
    assert_eq!(state.status, SyncStatus::Synced);
    assert_eq!(state.content_hash, content_hash(&remote));
    assert_eq!(store.get_last_sync_sequence().unwrap(), 12);

    assert_eq!(transport.pull_requests()[0].since_sequence, 0);
    assert_eq!(transport.pull_requests()[0].device_id, "device-a");
}

#[tokio::test]
async fn test_pull_applies_remote_delete() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    let note = Note::new("note-9", "Old note").with_content("kept on this device");
    hooks.seed(note.clone());
    store
        .set_sync_state("note-9", synced_state(&note, 3))
        .unwrap();

    transport.script_pull(Ok(PullResponse {
        changes: vec![RemoteChange {
            note_id: "note-9".to_string(),
            operation: ChangeOperation::Delete,
            version: 4,
            note: None,
        }],
        latest_sequence: 20,
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pulled, 1);
    assert!(hooks.note("note-9").is_none());
    assert_eq!(hooks.deleted_ids(), vec!["note-9".to_string()]);
    assert!(store.get_sync_state("note-9").unwrap().is_none());
    assert_eq!(store.get_last_sync_sequence().unwrap(), 20);
}

#[tokio::test]
async fn test_remote_edit_conflicts_with_pending_local_edit() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    let base = Note::new("note-1", "Plan").with_content("base");
    store
        .set_sync_state("note-1", synced_state(&base, 1))
        .unwrap();

    let local = base.clone().with_content("local edit");
    hooks.seed(local.clone());
    coordinator
        .tracker()
        .track_change(&local, ChangeOperation::Update)
        .unwrap();

    // The server is busy, so the local edit stays queued; meanwhile the
    // pull brings device B's competing edit.
    transport.script_push(Ok(PushResponse {
        errors: vec![RejectedChange {
            note_id: "note-1".to_string(),
            error: "storage busy".to_string(),
            retryable: true,
        }],
        ..PushResponse::default()
    }));
    let remote = Note::new("note-1", "Plan").with_content("remote edit");
    transport.script_pull(Ok(PullResponse {
        changes: vec![RemoteChange {
            note_id: "note-1".to_string(),
            operation: ChangeOperation::Update,
            version: 2,
            note: Some(remote.clone()),
        }],
        latest_sequence: 5,
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pulled, 0);
    assert_eq!(report.conflicts, 1);

    // The remote copy was not applied over the local edit.
    assert_eq!(hooks.note("note-1").unwrap().content, "local edit");
    assert_eq!(store.get_queued_change("note-1").unwrap().unwrap().version, 2);

    let resolver = coordinator.resolver();
    let conflict = resolver.get_conflict("note-1").unwrap();
    assert_eq!(conflict.reason, ConflictReason::Edit);
    assert_eq!(conflict.local_version, 2);
    assert_eq!(conflict.remote_version, 2);
    assert_eq!(conflict.remote_note.as_ref().unwrap().content, "remote edit");

    // The stream was still consumed.
    assert_eq!(store.get_last_sync_sequence().unwrap(), 5);
}

#[tokio::test]
async fn test_remote_delete_of_locally_edited_note() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    let base = Note::new("note-1", "Plan").with_content("base");
    store
        .set_sync_state("note-1", synced_state(&base, 1))
        .unwrap();

    let local = base.clone().with_content("local edit");
    hooks.seed(local.clone());
    coordinator
        .tracker()
        .track_change(&local, ChangeOperation::Update)
        .unwrap();

    transport.script_push(Ok(PushResponse {
        errors: vec![RejectedChange {
            note_id: "note-1".to_string(),
            error: "storage busy".to_string(),
            retryable: true,
        }],
        ..PushResponse::default()
    }));
    transport.script_pull(Ok(PullResponse {
        changes: vec![RemoteChange {
            note_id: "note-1".to_string(),
            operation: ChangeOperation::Delete,
            version: 2,
            note: None,
        }],
        latest_sequence: 6,
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pulled, 0);
    assert_eq!(report.conflicts, 1);

    // The local edit survives the remote delete.
    assert_eq!(hooks.note("note-1").unwrap().content, "local edit");
    assert!(hooks.deleted_ids().is_empty());
    assert!(store.get_sync_state("note-1").unwrap().is_some());

    let conflict = coordinator.resolver().get_conflict("note-1").unwrap();
    assert_eq!(conflict.reason, ConflictReason::DeleteEdit);
    assert!(conflict.remote_note.is_none());
}

#[tokio::test]
async fn test_identical_remote_content_is_not_a_conflict() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    let base = Note::new("note-1", "Plan").with_content("base");
    store
        .set_sync_state("note-1", synced_state(&base, 1))
        .unwrap();

    let local = base.clone().with_content("same words");
    hooks.seed(local.clone());
    coordinator
        .tracker()
        .track_change(&local, ChangeOperation::Update)
        .unwrap();

    transport.script_push(Ok(PushResponse {
        errors: vec![RejectedChange {
            note_id: "note-1".to_string(),
            error: "storage busy".to_string(),
            retryable: true,
        }],
        ..PushResponse::default()
    }));
    // Device B arrived at the same words independently.
    let remote = Note::new("note-1", "Plan").with_content("same words");
    transport.script_pull(Ok(PullResponse {
        changes: vec![RemoteChange {
            note_id: "note-1".to_string(),
            operation: ChangeOperation::Update,
            version: 2,
            note: Some(remote),
        }],
        latest_sequence: 5,
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pulled, 1);
    assert_eq!(report.conflicts, 0);

    // The remote version is adopted and nothing is left to push.
    let state = store.get_sync_state("note-1").unwrap().unwrap();
    assert_eq!(state.status, SyncStatus::Synced);
    assert_eq!(state.server_version, Some(2));
    assert_eq!(store.queued_change_count().unwrap(), 0);
}

#[tokio::test]
async fn test_own_push_echo_is_skipped_on_pull() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    let note = Note::new("note-1", "Groceries").with_content("milk");
    coordinator
        .tracker()
        .track_change(&note, ChangeOperation::Create)
        .unwrap();

    transport.script_push(Ok(accepted("note-1", 1)));
    // The server's change feed includes the change we just pushed.
    transport.script_pull(Ok(PullResponse {
        changes: vec![RemoteChange {
            note_id: "note-1".to_string(),
            operation: ChangeOperation::Create,
            version: 1,
            note: Some(note.clone()),
        }],
        latest_sequence: 1,
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pushed, 1);
    assert_eq!(report.pulled, 0);
    assert_eq!(hooks.saves(), 0);
    assert_eq!(store.get_last_sync_sequence().unwrap(), 1);
}

#[tokio::test]
async fn test_cursor_never_rewinds() {
    use memex_core::SyncStore;

    let (store, transport, _hooks, coordinator) = setup();
    store.set_last_sync_sequence(40).unwrap();

    transport.script_pull(Ok(PullResponse {
        changes: vec![],
        latest_sequence: 17,
    }));
    coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(store.get_last_sync_sequence().unwrap(), 40);

    transport.script_pull(Ok(PullResponse {
        changes: vec![],
        latest_sequence: 41,
    }));
    coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(store.get_last_sync_sequence().unwrap(), 41);

    // An equal sequence leaves the cursor alone too.
    transport.script_pull(Ok(PullResponse {
        changes: vec![],
        latest_sequence: 41,
    }));
    coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(store.get_last_sync_sequence().unwrap(), 41);

    let requests = transport.pull_requests();
    assert_eq!(requests[0].since_sequence, 40);
    assert_eq!(requests[1].since_sequence, 40);
    assert_eq!(requests[2].since_sequence, 41);
}

#[tokio::test]
async fn test_pull_isolates_per_note_failures() {
    use memex_core::SyncStore;

    let (store, transport, hooks, coordinator) = setup();
    hooks.fail_saves_for("note-bad");

    transport.script_pull(Ok(PullResponse {
        changes: vec![
            RemoteChange {
                note_id: "note-bad".to_string(),
                operation: ChangeOperation::Update,
                version: 2,
                note: Some(Note::new("note-bad", "Broken").with_content("nope")),
            },
            RemoteChange {
                note_id: "note-malformed".to_string(),
                operation: ChangeOperation::Update,
                version: 3,
                note: None,
            },
            RemoteChange {
                note_id: "note-good".to_string(),
                operation: ChangeOperation::Create,
                version: 4,
                note: Some(Note::new("note-good", "Fine").with_content("ok")),
            },
        ],
        latest_sequence: 9,
    }));

    let report = coordinator.run_sync_cycle().await.unwrap();
    assert_eq!(report.pulled, 1);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors.iter().any(|e| e.contains("note-bad")));
    assert!(report.errors.iter().any(|e| e.contains("note-malformed")));

    assert!(hooks.note("note-good").is_some());
    // Failed applications leave no partial sync state behind.
    assert!(store.get_sync_state("note-bad").unwrap().is_none());
    assert!(store.get_sync_state("note-malformed").unwrap().is_none());
    assert_eq!(store.get_last_sync_sequence().unwrap(), 9);
}
