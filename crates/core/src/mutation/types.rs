/// Write commands the version lifecycle hands to a snapshot store.
///
/// Each command is applied atomically by the store: either every row it
/// touches changes, or none do.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentId, Snapshot, SnapshotId, SnapshotPayload};

/// Replace a document's current snapshot with a freshly inserted one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTransition {
    pub document_id: DocumentId,
    /// The snapshot the caller read as current. The store refuses the
    /// transition if the document has moved on since.
    pub expected_current: SnapshotId,
    /// The new snapshot, already flagged current.
    pub snapshot: Snapshot,
    pub at: DateTime<Utc>,
}

/// Rewrite the payload of the current snapshot without allocating a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InPlaceUpdate {
    pub document_id: DocumentId,
    pub snapshot_id: SnapshotId,
    pub payload: SnapshotPayload,
    pub at: DateTime<Utc>,
}

/// Point a surviving snapshot at a new base before its old base is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relink {
    pub snapshot_id: SnapshotId,
    pub new_base: Option<SnapshotId>,
}

/// Retention pass over one document: relinks run first, then deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrunePlan {
    pub document_id: DocumentId,
    pub relinks: Vec<Relink>,
    pub deletions: Vec<SnapshotId>,
}

impl PrunePlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty()
    }
}

/// What a retention pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub deleted: usize,
    pub relinked: usize,
    pub remaining: usize,
}
