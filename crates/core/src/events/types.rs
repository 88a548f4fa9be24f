use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentId, OwnerId, SnapshotId};

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Created,
    Saved,
    UpdatedInPlace,
    Restored,
    Pruned,
    Deleted,
}

/// Coarse "something changed for this owner" notification.
///
/// Carries no payload diff; listeners refetch what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEvent {
    pub kind: ChangeKind,
    pub owner_id: OwnerId,
    pub document_id: DocumentId,
    pub snapshot_id: Option<SnapshotId>,
    pub version: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

impl DocumentEvent {
    pub fn new(kind: ChangeKind, owner_id: OwnerId, document_id: DocumentId) -> Self {
        Self {
            kind,
            owner_id,
            document_id,
            snapshot_id: None,
            version: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_snapshot(mut self, snapshot_id: SnapshotId, version: i32) -> Self {
        self.snapshot_id = Some(snapshot_id);
        self.version = Some(version);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
