//! Sync cycle orchestration.
//!
//! [`SyncCoordinator`] drives a full cycle: gather queued changes, push
//! them to the server, pull remote changes since the stored cursor, and
//! apply them through the host's [`NoteHooks`]. Changes that diverge are
//! routed to the [`ConflictResolver`] instead of being applied.

use crate::error::{Result, SyncError};
use crate::hooks::NoteHooks;
use crate::protocol::{AcceptedChange, PullRequest, PushChange, PushRequest, RemoteChange, StatusResponse};
use crate::transport::SyncTransport;
use memex_core::{
    ChangeOperation, ChangeTracker, ConflictReason, ConflictResolver, QueuedChange, SyncState,
    SyncStatus, SyncStore, content_hash,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

// ==================== Phases and progress ====================

/// Phase of the sync cycle, observable while a cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No cycle in progress.
    Idle,
    /// Snapshotting the queued changes.
    Gathering,
    /// Sending queued changes to the server.
    Pushing,
    /// Requesting remote changes since the cursor.
    Pulling,
    /// Applying remote changes locally.
    Applying,
    /// A conflict was just recorded. This phase is reported to progress
    /// callbacks but never blocks the cycle.
    Resolving,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Gathering => "gathering",
            SyncPhase::Pushing => "pushing",
            SyncPhase::Pulling => "pulling",
            SyncPhase::Applying => "applying",
            SyncPhase::Resolving => "resolving",
        };
        write!(f, "{}", s)
    }
}

/// Progress snapshot delivered on each phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SyncProgress {
    /// Phase just entered.
    pub phase: SyncPhase,
    /// Unresolved conflict count at that moment.
    pub conflicts: usize,
}

/// Callback invoked on phase transitions and conflict detection.
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

// ==================== Cycle report ====================

/// Outcome of one completed sync cycle.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SyncReport {
    /// Changes the server accepted during push.
    pub pushed: usize,
    /// Remote changes applied locally during pull.
    pub pulled: usize,
    /// Unresolved conflicts after the cycle.
    pub conflicts: usize,
    /// Errors collected across both phases, one entry per failure.
    pub errors: Vec<String>,
}

impl SyncReport {
    /// True when any per-note or phase failure was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ==================== Coordinator ====================

/// Orchestrates push/pull sync cycles against the remote server.
///
/// One logical sync worker per store: while a cycle is in progress,
/// re-entrant calls fail with [`SyncError::AlreadyRunning`]. Push always
/// finishes (including transport retries) before pull starts, because
/// the pull conflict check relies on push having cleared accepted
/// entries from the queue.
pub struct SyncCoordinator {
    store: Arc<dyn SyncStore>,
    transport: Arc<dyn SyncTransport>,
    hooks: Arc<dyn NoteHooks>,
    tracker: ChangeTracker,
    resolver: Arc<ConflictResolver>,
    device_id: String,
    online: AtomicBool,
    cycle_lock: Mutex<()>,
    phase: RwLock<SyncPhase>,
    on_progress: RwLock<Option<ProgressCallback>>,
}

impl SyncCoordinator {
    /// Create a coordinator over the given store, transport and hooks.
    ///
    /// The coordinator starts online with no cycle running.
    pub fn new(
        store: Arc<dyn SyncStore>,
        transport: Arc<dyn SyncTransport>,
        hooks: Arc<dyn NoteHooks>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            tracker: ChangeTracker::new(store.clone()),
            resolver: Arc::new(ConflictResolver::new(store.clone())),
            store,
            transport,
            hooks,
            device_id: device_id.into(),
            online: AtomicBool::new(true),
            cycle_lock: Mutex::new(()),
            phase: RwLock::new(SyncPhase::Idle),
            on_progress: RwLock::new(None),
        }
    }

    /// The change tracker bound to this coordinator's store.
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// The conflict resolver holding unresolved conflicts.
    pub fn resolver(&self) -> Arc<ConflictResolver> {
        self.resolver.clone()
    }

    /// Update the host-reported connectivity flag.
    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was != online {
            log::info!(
                "[SyncCoordinator] Network is now {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    /// Whether the host currently reports the device online.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Phase of the cycle in progress, `Idle` between cycles.
    pub fn current_phase(&self) -> SyncPhase {
        *self.phase.read().unwrap()
    }

    /// Install a progress callback, replacing any previous one.
    pub fn set_on_progress(&self, callback: ProgressCallback) {
        *self.on_progress.write().unwrap() = Some(callback);
    }

    fn set_phase(&self, phase: SyncPhase) {
        *self.phase.write().unwrap() = phase;
        self.emit_progress(phase);
    }

    fn emit_progress(&self, phase: SyncPhase) {
        let conflicts = self.resolver.conflict_count();
        if let Some(callback) = self.on_progress.read().unwrap().as_ref() {
            callback(SyncProgress { phase, conflicts });
        }
    }

    /// Probe the server's status endpoint.
    ///
    /// Honors the offline flag but not the cycle lock, so hosts can poll
    /// while a cycle runs.
    pub async fn check_server(&self) -> Result<StatusResponse> {
        if !self.is_online() {
            return Err(SyncError::Offline);
        }
        self.transport.check_status().await
    }

    /// Run one full sync cycle: push queued changes, then pull and apply
    /// remote ones.
    ///
    /// Fails fast with [`SyncError::AlreadyRunning`] when a cycle is in
    /// progress and [`SyncError::Offline`] when the host reports no
    /// connectivity. Transport failures abort the affected phase and are
    /// reported in the returned [`SyncReport`]; queued changes survive
    /// for the next cycle.
    pub async fn run_sync_cycle(&self) -> Result<SyncReport> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            log::debug!("[SyncCoordinator] Cycle already in progress, rejecting");
            return Err(SyncError::AlreadyRunning);
        };
        if !self.is_online() {
            log::debug!("[SyncCoordinator] Offline, skipping cycle");
            return Err(SyncError::Offline);
        }

        log::debug!(
            "[SyncCoordinator] Starting cycle for device {}",
            self.device_id
        );
        let mut report = SyncReport::default();

        let push_ok = match self.run_push_phase(&mut report).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("[SyncCoordinator] Push phase aborted: {}", err);
                report.errors.push(format!("push failed: {}", err));
                false
            }
        };

        // A failed push leaves the queue intact; pulling anyway could
        // surface those same notes as spurious conflicts.
        if push_ok {
            if let Err(err) = self.run_pull_phase(&mut report).await {
                log::warn!("[SyncCoordinator] Pull phase aborted: {}", err);
                report.errors.push(format!("pull failed: {}", err));
            }
        }

        report.conflicts = self.resolver.conflict_count();
        self.set_phase(SyncPhase::Idle);
        log::info!(
            "[SyncCoordinator] Cycle complete: {} pushed, {} pulled, {} conflicts, {} errors",
            report.pushed,
            report.pulled,
            report.conflicts,
            report.errors.len()
        );
        Ok(report)
    }

    // ==================== Push phase ====================

    async fn run_push_phase(&self, report: &mut SyncReport) -> Result<()> {
        self.set_phase(SyncPhase::Gathering);
        let queued = self.store.get_queued_changes()?;
        if queued.is_empty() {
            log::debug!("[SyncCoordinator] Nothing to push");
            return Ok(());
        }

        let request = PushRequest {
            device_id: self.device_id.clone(),
            changes: queued.iter().map(PushChange::from_queued).collect(),
        };

        self.set_phase(SyncPhase::Pushing);
        log::debug!(
            "[SyncCoordinator] Pushing {} change(s)",
            request.changes.len()
        );
        let response = self.transport.push(&request).await?;

        // Index the snapshot so verdicts can be matched back to the
        // operations that produced them.
        let by_note: HashMap<&str, &QueuedChange> =
            queued.iter().map(|c| (c.note_id.as_str(), c)).collect();

        for accepted in &response.accepted {
            match self.apply_accepted(accepted, &by_note) {
                Ok(()) => report.pushed += 1,
                Err(err) => {
                    report
                        .errors
                        .push(format!("note {}: {}", accepted.note_id, err));
                }
            }
        }

        for conflicted in &response.conflicts {
            let local_version = by_note
                .get(conflicted.note_id.as_str())
                .map(|c| c.version)
                .unwrap_or(0);
            let local_note = match self.hooks.read_note(&conflicted.note_id).await {
                Ok(note) => note,
                Err(err) => {
                    report.errors.push(format!(
                        "note {}: failed to read local copy: {}",
                        conflicted.note_id, err
                    ));
                    None
                }
            };
            self.resolver.detect_conflict(
                &conflicted.note_id,
                local_note,
                conflicted.server_note.clone(),
                local_version,
                conflicted.server_version,
                ConflictReason::Edit,
            );
            self.emit_progress(SyncPhase::Resolving);
            report.errors.push(format!(
                "note {}: rejected, server holds newer version {}",
                conflicted.note_id, conflicted.server_version
            ));
        }

        for rejected in &response.errors {
            log::warn!(
                "[SyncCoordinator] Server rejected change for note {}: {} (retryable: {})",
                rejected.note_id,
                rejected.error,
                rejected.retryable
            );
            report
                .errors
                .push(format!("note {}: {}", rejected.note_id, rejected.error));
            if rejected.retryable {
                self.store
                    .mark_change_attempted(&rejected.note_id, &rejected.error)?;
            }
        }

        Ok(())
    }

    /// Finalize one accepted change: record the server version and clear
    /// the queue entry.
    fn apply_accepted(
        &self,
        accepted: &AcceptedChange,
        snapshot: &HashMap<&str, &QueuedChange>,
    ) -> Result<()> {
        let sent = snapshot.get(accepted.note_id.as_str());
        let current = self.store.get_queued_change(&accepted.note_id)?;

        // A change tracked mid-cycle replaces the snapshot entry. The
        // verdict covers only the version we sent, so the newer entry
        // stays queued for the next cycle.
        if let (Some(sent), Some(current)) = (sent, current.as_ref()) {
            if current.version != sent.version {
                log::debug!(
                    "[SyncCoordinator] Note {} changed during push (v{} now queued), deferring",
                    accepted.note_id,
                    current.version
                );
                if sent.operation != ChangeOperation::Delete {
                    if let Some(mut state) = self.store.get_sync_state(&accepted.note_id)? {
                        state.server_version = Some(accepted.server_version);
                        state.last_synced_at = Some(chrono::Utc::now().timestamp_millis());
                        self.store.set_sync_state(&accepted.note_id, state)?;
                    }
                }
                return Ok(());
            }
        }

        match sent.map(|c| c.operation) {
            Some(ChangeOperation::Delete) => {
                // An acknowledged delete drops the note's sync state
                // entirely; the note no longer exists on either side.
                self.store.delete_sync_state(&accepted.note_id)?;
            }
            _ => {
                self.tracker
                    .mark_synced(&accepted.note_id, accepted.server_version)?;
            }
        }
        self.store.remove_queued_change(&accepted.note_id)?;
        Ok(())
    }

    // ==================== Pull phase ====================

    async fn run_pull_phase(&self, report: &mut SyncReport) -> Result<()> {
        self.set_phase(SyncPhase::Pulling);
        let since_sequence = self.store.get_last_sync_sequence()?;
        let request = PullRequest {
            device_id: self.device_id.clone(),
            since_sequence,
        };
        let response = self.transport.pull(&request).await?;
        log::debug!(
            "[SyncCoordinator] Pulled {} remote change(s) since sequence {}",
            response.changes.len(),
            since_sequence
        );

        self.set_phase(SyncPhase::Applying);
        for change in &response.changes {
            match self.apply_remote_change(change, report).await {
                Ok(true) => report.pulled += 1,
                Ok(false) => {}
                Err(err) => {
                    report
                        .errors
                        .push(format!("note {}: {}", change.note_id, err));
                }
            }
        }

        // The cursor only moves forward; a lagging response must not
        // rewind it.
        if response.latest_sequence > since_sequence {
            self.store.set_last_sync_sequence(response.latest_sequence)?;
            log::debug!(
                "[SyncCoordinator] Advanced pull cursor to {}",
                response.latest_sequence
            );
        }
        Ok(())
    }

    /// Apply one remote change. Returns `Ok(true)` when the change was
    /// applied locally, `Ok(false)` when it was skipped.
    async fn apply_remote_change(
        &self,
        change: &RemoteChange,
        report: &mut SyncReport,
    ) -> Result<bool> {
        let state = self.store.get_sync_state(&change.note_id)?;

        // Replays and echoes of this device's own pushes are dropped:
        // anything at or below the acknowledged server version has
        // already been applied.
        if let Some(state) = &state {
            if change.version <= state.server_version.unwrap_or(0) {
                log::debug!(
                    "[SyncCoordinator] Skipping remote change for note {} (v{} already known)",
                    change.note_id,
                    change.version
                );
                return Ok(false);
            }
        }

        if let Some(state) = &state {
            if state.is_pending() {
                let local_note = self.hooks.read_note(&change.note_id).await?;
                let conflicted = self.resolver.has_conflict(
                    &change.note_id,
                    local_note.as_ref(),
                    change.note.as_ref(),
                    change.version,
                )?;
                if conflicted {
                    let reason = match change.operation {
                        ChangeOperation::Delete => ConflictReason::DeleteEdit,
                        _ => ConflictReason::Edit,
                    };
                    self.resolver.detect_conflict(
                        &change.note_id,
                        local_note,
                        change.note.clone(),
                        state.local_version,
                        change.version,
                        reason,
                    );
                    self.emit_progress(SyncPhase::Resolving);
                    report.errors.push(format!(
                        "note {}: remote change conflicts with a pending local change ({})",
                        change.note_id, reason
                    ));
                    return Ok(false);
                }
            }
        }

        match change.operation {
            ChangeOperation::Delete => {
                self.hooks.delete_note(&change.note_id).await?;
                self.store.remove_queued_change(&change.note_id)?;
                self.store.delete_sync_state(&change.note_id)?;
                log::debug!(
                    "[SyncCoordinator] Applied remote delete for note {}",
                    change.note_id
                );
            }
            _ => {
                let Some(note) = &change.note else {
                    return Err(SyncError::InvalidResponse(format!(
                        "remote {} for note {} is missing its payload",
                        change.operation, change.note_id
                    )));
                };
                self.hooks.save_note(note).await?;
                self.store.remove_queued_change(&change.note_id)?;
                self.store.set_sync_state(
                    &change.note_id,
                    SyncState {
                        local_version: change.version,
                        server_version: Some(change.version),
                        content_hash: content_hash(note),
                        status: SyncStatus::Synced,
                        last_synced_at: Some(chrono::Utc::now().timestamp_millis()),
                    },
                )?;
                log::debug!(
                    "[SyncCoordinator] Applied remote {} for note {} (v{})",
                    change.operation,
                    change.note_id,
                    change.version
                );
            }
        }
        Ok(true)
    }
}
