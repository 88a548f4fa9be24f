//! Tracks unsaved edits for the document open in an editor, debounces
//! autosaves and arbitrates switching to another document.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::autosave::AutosaveTimer;
use super::state::{Draft, EditorState, SaveState};
use crate::config::VersioningConfig;
use crate::document::{Document, DocumentId, OwnerId, Snapshot, SnapshotPayload};
use crate::error::{VersioningError, VersioningResult};
use crate::events::{ChangeKind, DocumentEvent, Subscription};
use crate::structured::{merge, MergeStatus, PartialUpdate, StructuredDocument, Vocabulary};
use crate::versioning::VersionManager;

/// How to resolve a switch requested while edits were unsaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwitchChoice {
    Discard,
    SaveAndSwitch,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    /// The target is now loaded.
    Switched(Box<Document>),
    /// Unsaved edits block the switch; call
    /// [`EditorCoordinator::resolve_switch`].
    NeedsDecision { from: DocumentId, to: DocumentId },
    /// The user chose to stay.
    Stayed,
}

/// What closing the editor left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOutcome {
    pub abandoned_unsaved: bool,
}

/// Read-only view of the editor for callers.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorStatus {
    pub document_id: Option<DocumentId>,
    pub status: SaveState,
    pub has_unsaved_changes: bool,
    pub pending_switch: Option<DocumentId>,
    pub remote_changed: bool,
    pub last_error: Option<String>,
    pub last_saved_at: Option<chrono::DateTime<chrono::Utc>>,
}

struct Inner {
    manager: Arc<VersionManager>,
    state: Mutex<EditorState>,
    document: Mutex<Option<Document>>,
    timer: Mutex<AutosaveTimer>,
    vocabulary: Mutex<Vocabulary>,
}

/// Cheap to clone; all clones drive the same editor.
#[derive(Clone)]
pub struct EditorCoordinator {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl EditorCoordinator {
    pub fn new(manager: Arc<VersionManager>, autosave_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                manager,
                state: Mutex::new(EditorState::default()),
                document: Mutex::new(None),
                timer: Mutex::new(AutosaveTimer::new(autosave_delay)),
                vocabulary: Mutex::new(Vocabulary::special_only()),
            }),
        }
    }

    /// Editor whose autosave debounce follows `config.autosave_delay`.
    pub fn with_config(manager: Arc<VersionManager>, config: &VersioningConfig) -> Self {
        Self::new(manager, config.autosave_delay)
    }

    pub fn status(&self) -> EditorStatus {
        let state = lock(&self.inner.state);
        EditorStatus {
            document_id: state.draft.as_ref().map(|d| d.document_id),
            status: state.status,
            has_unsaved_changes: state.has_unsaved_changes(),
            pending_switch: state.pending_switch,
            remote_changed: state.remote_changed,
            last_error: state.last_error.clone(),
            last_saved_at: state.last_saved_at,
        }
    }

    pub fn draft(&self) -> Option<Draft> {
        lock(&self.inner.state).draft.clone()
    }

    pub fn document(&self) -> Option<Document> {
        lock(&self.inner.document).clone()
    }

    pub fn autosave_armed(&self) -> bool {
        lock(&self.inner.timer).is_armed()
    }

    /// Ask to show `target`. Switches straight away unless the current draft
    /// has unsaved edits, in which case the request is staged.
    pub async fn request_switch(&self, target: DocumentId) -> VersioningResult<SwitchOutcome> {
        {
            let mut state = lock(&self.inner.state);
            if state.has_unsaved_changes() {
                let from = state.draft.as_ref().map(|d| d.document_id).unwrap_or(target);
                state.pending_switch = Some(target);
                debug!(%from, to = %target, "switch staged behind unsaved edits");
                return Ok(SwitchOutcome::NeedsDecision { from, to: target });
            }
        }
        self.load(target).await
    }

    /// Resolve a staged switch.
    pub async fn resolve_switch(&self, choice: SwitchChoice) -> VersioningResult<SwitchOutcome> {
        let target = lock(&self.inner.state).pending_switch.ok_or_else(|| {
            VersioningError::InvariantViolation("no document switch is pending".to_string())
        })?;

        match choice {
            SwitchChoice::Cancel => {
                lock(&self.inner.state).pending_switch = None;
                Ok(SwitchOutcome::Stayed)
            }
            SwitchChoice::Discard => {
                lock(&self.inner.state).discard();
                info!(to = %target, "unsaved edits discarded for switch");
                self.load(target).await
            }
            SwitchChoice::SaveAndSwitch => {
                self.save().await?;
                if lock(&self.inner.state).has_unsaved_changes() {
                    // Edits landed while saving; keep the decision open.
                    let from = self.draft().map(|d| d.document_id).unwrap_or(target);
                    return Ok(SwitchOutcome::NeedsDecision { from, to: target });
                }
                self.load(target).await
            }
        }
    }

    async fn load(&self, target: DocumentId) -> VersioningResult<SwitchOutcome> {
        let document = self.inner.manager.get_document(target).await?;
        let snapshot = self.inner.manager.current_snapshot(target).await?;

        lock(&self.inner.timer).cancel();
        let vocabulary = vocabulary_for(&document);
        *lock(&self.inner.vocabulary) = vocabulary;
        lock(&self.inner.state).load(&snapshot);
        *lock(&self.inner.document) = Some(document.clone());
        debug!(document = %target, version = snapshot.version, "document loaded");
        Ok(SwitchOutcome::Switched(Box::new(document)))
    }

    pub fn edit_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit(move |p| p.title = title);
    }

    pub fn edit_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.edit(move |p| p.content = content);
    }

    /// Fold one section widget's update into the structured draft.
    ///
    /// Content that does not parse as a structured document is left alone and
    /// reported as unchanged.
    pub fn apply_structured_update(&self, update: &PartialUpdate) -> Option<MergeStatus> {
        let vocabulary = lock(&self.inner.vocabulary).clone();
        let mut status = None;
        self.edit(|payload| {
            let previous = match StructuredDocument::parse(&payload.content) {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(error = %err, "draft content is not a structured document");
                    return;
                }
            };
            let outcome = merge(&previous, update, &vocabulary);
            if outcome.is_applied() {
                payload.content = outcome.document.to_json();
            }
            status = Some(outcome.status);
        });
        status
    }

    fn edit<F>(&self, change: F)
    where
        F: FnOnce(&mut SnapshotPayload),
    {
        let arm = lock(&self.inner.state).edit(change);
        if arm {
            self.arm_autosave();
        }
    }

    fn arm_autosave(&self) {
        let this = self.clone();
        lock(&self.inner.timer).arm(async move {
            this.autosave_fired().await;
        });
    }

    async fn autosave_fired(&self) {
        lock(&self.inner.timer).release();
        if lock(&self.inner.state).status != SaveState::Unsaved {
            return;
        }
        if let Err(err) = self.save().await {
            warn!(error = %err, "autosave failed");
        }
    }

    /// Save the draft now, through the session heuristic. Returns `None` when
    /// there was nothing to save or a save is already in flight.
    pub async fn save(&self) -> VersioningResult<Option<Snapshot>> {
        let Some((document_id, payload)) = lock(&self.inner.state).begin_save() else {
            return Ok(None);
        };
        lock(&self.inner.timer).cancel();

        match self.inner.manager.autosave(document_id, payload.clone()).await {
            Ok(outcome) => {
                let created = outcome.created_version();
                let snapshot = outcome.into_snapshot();
                let rearm = lock(&self.inner.state).finish_save(
                    snapshot.id,
                    payload,
                    self.inner.manager.now(),
                );
                if let Some(document) = lock(&self.inner.document).as_mut() {
                    document.title = snapshot.payload.title.clone();
                    document.current_snapshot_id = Some(snapshot.id);
                }
                debug!(version = snapshot.version, created, "draft saved");
                if rearm {
                    self.arm_autosave();
                }
                Ok(Some(snapshot))
            }
            Err(err) => {
                lock(&self.inner.state).fail_save(err.to_string());
                Err(err)
            }
        }
    }

    /// React to a change notification from the feed. The local draft always
    /// wins: a dirty editor only records that the document moved underneath.
    pub async fn handle_change(&self, event: DocumentEvent) -> VersioningResult<()> {
        let loaded = lock(&self.inner.state).draft.as_ref().map(|d| d.document_id);
        if loaded != Some(event.document_id) {
            return Ok(());
        }
        if event.kind == ChangeKind::Deleted {
            lock(&self.inner.state).remote_changed = true;
            return Ok(());
        }

        let snapshot = self.inner.manager.current_snapshot(event.document_id).await?;
        let mut state = lock(&self.inner.state);
        let already_loaded = state
            .draft
            .as_ref()
            .is_some_and(|d| d.snapshot_id == snapshot.id && d.baseline == snapshot.payload);
        if already_loaded {
            return Ok(());
        }
        match state.status {
            SaveState::Idle | SaveState::Saved => {
                let last_saved_at = state.last_saved_at;
                state.load(&snapshot);
                state.last_saved_at = last_saved_at;
                debug!(document = %event.document_id, "reloaded after external change");
            }
            // Most likely our own write landing; `finish_save` rebases.
            SaveState::Saving => {}
            SaveState::Unsaved | SaveState::Error => state.remote_changed = true,
        }
        Ok(())
    }

    /// Forward change notifications for `owner` into this editor.
    pub fn follow(&self, owner: OwnerId) -> Subscription {
        let this = self.clone();
        self.inner.manager.events().subscribe_owner(owner, move |event| {
            let this = this.clone();
            tokio::spawn(async move {
                if let Err(err) = this.handle_change(event).await {
                    warn!(error = %err, "failed to apply external change");
                }
            });
        })
    }

    /// Tear the editor down: pending autosaves are cancelled and nothing is
    /// saved on the way out.
    pub fn close(&self) -> CloseOutcome {
        lock(&self.inner.timer).cancel();
        let abandoned_unsaved = lock(&self.inner.state).has_unsaved_changes();
        if abandoned_unsaved {
            warn!("editor closed with unsaved edits");
        }
        CloseOutcome { abandoned_unsaved }
    }
}

/// Structured documents name their section layout in `canvasType`.
fn vocabulary_for(document: &Document) -> Vocabulary {
    document
        .metadata
        .extra
        .get("canvasType")
        .and_then(|v| v.as_str())
        .and_then(Vocabulary::named)
        .unwrap_or_default()
}
