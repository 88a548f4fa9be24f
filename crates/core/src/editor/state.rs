//! Save-state machine for one editor session.
//!
//! `idle -> unsaved` when the draft diverges from the snapshot it was loaded
//! from, `unsaved -> saving -> saved` around a successful save and
//! `saving -> error` on failure. The draft is never touched by a failed save.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentId, Snapshot, SnapshotId, SnapshotPayload};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    #[default]
    Idle,
    Unsaved,
    Saving,
    Saved,
    Error,
}

/// In-memory edit state derived from a loaded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub document_id: DocumentId,
    /// Snapshot the baseline was taken from.
    pub snapshot_id: SnapshotId,
    pub baseline: SnapshotPayload,
    pub current: SnapshotPayload,
}

impl Draft {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            document_id: snapshot.document_id,
            snapshot_id: snapshot.id,
            baseline: snapshot.payload.clone(),
            current: snapshot.payload.clone(),
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.baseline != self.current
    }

    /// Throw edits away and go back to the loaded snapshot.
    pub fn discard(&mut self) {
        self.current = self.baseline.clone();
    }

    /// Adopt `payload` as written to `snapshot_id`, keeping any edits made
    /// since it was captured.
    pub fn rebase(&mut self, snapshot_id: SnapshotId, payload: SnapshotPayload) {
        self.snapshot_id = snapshot_id;
        self.baseline = payload;
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub draft: Option<Draft>,
    pub status: SaveState,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Document the user asked to switch to while edits were unsaved.
    pub pending_switch: Option<DocumentId>,
    /// The loaded document changed elsewhere while the local draft was dirty.
    pub remote_changed: bool,
}

impl EditorState {
    pub fn has_unsaved_changes(&self) -> bool {
        self.draft.as_ref().is_some_and(Draft::has_unsaved_changes)
    }

    pub fn load(&mut self, snapshot: &Snapshot) {
        self.draft = Some(Draft::from_snapshot(snapshot));
        self.status = SaveState::Idle;
        self.last_error = None;
        self.pending_switch = None;
        self.remote_changed = false;
    }

    /// Apply an edit. Returns whether the autosave timer should be (re)armed.
    pub fn edit<F>(&mut self, change: F) -> bool
    where
        F: FnOnce(&mut SnapshotPayload),
    {
        let Some(draft) = self.draft.as_mut() else {
            return false;
        };
        change(&mut draft.current);
        let dirty = draft.has_unsaved_changes();

        match self.status {
            // A save is in flight; its completion re-evaluates the draft.
            SaveState::Saving => false,
            _ if dirty => {
                self.status = SaveState::Unsaved;
                true
            }
            SaveState::Unsaved => {
                self.status = self.clean_status();
                false
            }
            _ => false,
        }
    }

    /// Move to `saving` and hand out what to write, if a save may start.
    pub fn begin_save(&mut self) -> Option<(DocumentId, SnapshotPayload)> {
        if !matches!(self.status, SaveState::Unsaved | SaveState::Error) {
            return None;
        }
        let draft = self.draft.as_ref()?;
        if !draft.has_unsaved_changes() {
            self.status = self.clean_status();
            return None;
        }
        self.status = SaveState::Saving;
        Some((draft.document_id, draft.current.clone()))
    }

    /// Record a successful save of `written`. Returns whether edits made
    /// during the save still need saving.
    pub fn finish_save(
        &mut self,
        snapshot_id: SnapshotId,
        written: SnapshotPayload,
        at: DateTime<Utc>,
    ) -> bool {
        self.last_saved_at = Some(at);
        self.last_error = None;
        let Some(draft) = self.draft.as_mut() else {
            self.status = SaveState::Saved;
            return false;
        };
        draft.rebase(snapshot_id, written);
        if draft.has_unsaved_changes() {
            self.status = SaveState::Unsaved;
            true
        } else {
            self.status = SaveState::Saved;
            false
        }
    }

    pub fn fail_save(&mut self, error: impl Into<String>) {
        self.status = SaveState::Error;
        self.last_error = Some(error.into());
    }

    pub fn discard(&mut self) {
        if let Some(draft) = self.draft.as_mut() {
            draft.discard();
        }
        self.status = SaveState::Idle;
        self.last_error = None;
    }

    fn clean_status(&self) -> SaveState {
        if self.last_saved_at.is_some() {
            SaveState::Saved
        } else {
            SaveState::Idle
        }
    }
}
