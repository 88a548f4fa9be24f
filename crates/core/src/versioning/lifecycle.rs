//! Create, save, restore and retire document snapshots.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::diff::{diff_snapshots, VersionDiff};
use super::retention::DEFAULT_KEEP;
use super::session::{AutosaveDecision, BranchReason, SessionPolicy};
use crate::clock::{Clock, SystemClock};
use crate::config::VersioningConfig;
use crate::document::validate::{validate_doc_type, validate_payload};
use crate::document::{
    Document, DocumentId, DocumentMetadata, OwnerId, Snapshot, SnapshotId, SnapshotOrigin,
    SnapshotPayload, VersionKind, VersionSummary,
};
use crate::error::{VersioningError, VersioningResult};
use crate::events::{ChangeKind, DocumentEvent, EventBus};
use crate::mutation::{InPlaceUpdate, PruneReport, SnapshotTransition};
use crate::store::SnapshotStore;

/// Everything needed to create a document and its first snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub owner_id: OwnerId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_doc_type")]
    pub doc_type: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub origin: SnapshotOrigin,
}

fn default_doc_type() -> String {
    "document".to_string()
}

impl NewDocument {
    pub fn new(owner_id: OwnerId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            owner_id,
            title: title.into(),
            content: content.into(),
            doc_type: default_doc_type(),
            metadata: DocumentMetadata::default(),
            origin: SnapshotOrigin::Human,
        }
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = doc_type.into();
        self
    }

    pub fn with_origin(mut self, origin: SnapshotOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// What an autosave did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum AutosaveOutcome {
    UpdatedInPlace { snapshot: Snapshot },
    Created { snapshot: Snapshot, reason: BranchReason },
}

impl AutosaveOutcome {
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            AutosaveOutcome::UpdatedInPlace { snapshot } => snapshot,
            AutosaveOutcome::Created { snapshot, .. } => snapshot,
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        match self {
            AutosaveOutcome::UpdatedInPlace { snapshot } => snapshot,
            AutosaveOutcome::Created { snapshot, .. } => snapshot,
        }
    }

    pub fn created_version(&self) -> bool {
        matches!(self, AutosaveOutcome::Created { .. })
    }
}

/// The version lifecycle service. Construct one per process (or per
/// request) and share it behind an `Arc`.
pub struct VersionManager {
    store: Arc<dyn SnapshotStore>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    session: SessionPolicy,
    retention_keep: usize,
    pruning: Mutex<Vec<JoinHandle<()>>>,
}

impl VersionManager {
    pub fn new(store: Arc<dyn SnapshotStore>, events: EventBus) -> Self {
        Self {
            store,
            events,
            clock: Arc::new(SystemClock),
            session: SessionPolicy::default(),
            retention_keep: DEFAULT_KEEP,
            pruning: Mutex::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, config: &VersioningConfig) -> Self {
        self.session = SessionPolicy::new(config.session_timeout_chrono());
        self.retention_keep = config.retention_keep;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retention(mut self, keep: usize) -> Self {
        self.retention_keep = keep;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session_policy(&self) -> SessionPolicy {
        self.session
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create a document together with its `initial` snapshot, v1.
    #[tracing::instrument(skip(self, new), fields(owner = %new.owner_id))]
    pub async fn create_document(
        &self,
        new: NewDocument,
    ) -> VersioningResult<(Document, Snapshot)> {
        validate_doc_type(&new.doc_type)?;
        let payload = SnapshotPayload::new(new.title, new.content);
        validate_payload(&new.metadata, &payload)?;

        let now = self.clock.now();
        let document_id = DocumentId::new();
        let snapshot = Snapshot {
            id: SnapshotId::new(),
            document_id,
            version: 1,
            payload,
            kind: VersionKind::Initial,
            origin: new.origin,
            is_current: true,
            base_version_id: None,
            created_at: now,
            updated_at: now,
        };
        let document = Document {
            id: document_id,
            owner_id: new.owner_id,
            title: snapshot.payload.title.clone(),
            doc_type: new.doc_type,
            current_snapshot_id: Some(snapshot.id),
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_document(&document, &snapshot).await?;
        info!(document = %document.id, "document created");
        self.publish(
            DocumentEvent::new(ChangeKind::Created, document.owner_id, document.id)
                .with_snapshot(snapshot.id, snapshot.version)
                .at(now),
        );
        Ok((document, snapshot))
    }

    pub async fn get_document(&self, id: DocumentId) -> VersioningResult<Document> {
        self.store
            .get_document(id)
            .await?
            .ok_or_else(|| VersioningError::not_found("document", id))
    }

    pub async fn list_documents(&self, owner: OwnerId) -> VersioningResult<Vec<Document>> {
        self.store.list_documents(owner).await
    }

    /// The snapshot the document currently resolves to.
    pub async fn current_snapshot(&self, id: DocumentId) -> VersioningResult<Snapshot> {
        let document = self.get_document(id).await?;
        self.current_of(&document).await
    }

    async fn current_of(&self, document: &Document) -> VersioningResult<Snapshot> {
        let current_id = document.current_snapshot_id.ok_or_else(|| {
            VersioningError::InvariantViolation(format!(
                "document {} has no current snapshot",
                document.id
            ))
        })?;
        self.store
            .get_snapshot(current_id)
            .await?
            .ok_or_else(|| VersioningError::not_found("snapshot", current_id))
    }

    /// Commit `payload` as a new `update` snapshot, v(N+1).
    #[tracing::instrument(skip(self, payload))]
    pub async fn save_draft(
        &self,
        document_id: DocumentId,
        payload: SnapshotPayload,
    ) -> VersioningResult<Snapshot> {
        let document = self.get_document(document_id).await?;
        let current = self.current_of(&document).await?;
        self.commit_successor(
            &document,
            &current,
            payload,
            VersionKind::Update,
            SnapshotOrigin::Human,
            current.id,
        )
        .await
    }

    /// Like [`save_draft`](Self::save_draft), but the snapshot is flagged as
    /// generated so later autosaves never overwrite it.
    #[tracing::instrument(skip(self, payload))]
    pub async fn record_generated(
        &self,
        document_id: DocumentId,
        payload: SnapshotPayload,
    ) -> VersioningResult<Snapshot> {
        let document = self.get_document(document_id).await?;
        let current = self.current_of(&document).await?;
        self.commit_successor(
            &document,
            &current,
            payload,
            VersionKind::Update,
            SnapshotOrigin::Automated,
            current.id,
        )
        .await
    }

    /// Copy a historical snapshot's payload into a new current `restore`
    /// snapshot. The historical row itself is never touched.
    #[tracing::instrument(skip(self))]
    pub async fn restore_version(&self, snapshot_id: SnapshotId) -> VersioningResult<Snapshot> {
        let source = self
            .store
            .get_snapshot(snapshot_id)
            .await?
            .ok_or_else(|| VersioningError::not_found("snapshot", snapshot_id))?;
        let document = self.get_document(source.document_id).await?;
        let current = self.current_of(&document).await?;
        self.commit_successor(
            &document,
            &current,
            source.payload.clone(),
            VersionKind::Restore,
            SnapshotOrigin::Human,
            source.id,
        )
        .await
    }

    /// Save through the session heuristic: fold into the current snapshot
    /// while its editing session is live, otherwise commit a new one.
    #[tracing::instrument(skip(self, payload))]
    pub async fn autosave(
        &self,
        document_id: DocumentId,
        payload: SnapshotPayload,
    ) -> VersioningResult<AutosaveOutcome> {
        let document = self.get_document(document_id).await?;
        let current = self.current_of(&document).await?;
        let now = self.clock.now();

        match self.session.decide(&current, now) {
            AutosaveDecision::UpdateInPlace => {
                validate_payload(&document.metadata, &payload)?;
                let update = InPlaceUpdate {
                    document_id,
                    snapshot_id: current.id,
                    payload,
                    at: now,
                };
                self.store.update_in_place(&update).await?;
                debug!(version = current.version, "autosave folded into current snapshot");
                self.publish(
                    DocumentEvent::new(ChangeKind::UpdatedInPlace, document.owner_id, document_id)
                        .with_snapshot(current.id, current.version)
                        .at(now),
                );
                Ok(AutosaveOutcome::UpdatedInPlace {
                    snapshot: Snapshot {
                        payload: update.payload,
                        updated_at: now,
                        ..current
                    },
                })
            }
            AutosaveDecision::NewSnapshot(reason) => {
                debug!(?reason, "autosave opens a new snapshot");
                let snapshot = self
                    .commit_successor(
                        &document,
                        &current,
                        payload,
                        VersionKind::Update,
                        SnapshotOrigin::Human,
                        current.id,
                    )
                    .await?;
                Ok(AutosaveOutcome::Created { snapshot, reason })
            }
        }
    }

    async fn commit_successor(
        &self,
        document: &Document,
        current: &Snapshot,
        payload: SnapshotPayload,
        kind: VersionKind,
        origin: SnapshotOrigin,
        base: SnapshotId,
    ) -> VersioningResult<Snapshot> {
        validate_payload(&document.metadata, &payload)?;
        let version = current.version.checked_add(1).ok_or_else(|| {
            VersioningError::InvariantViolation(format!(
                "document {} has exhausted its version numbers",
                document.id
            ))
        })?;

        let now = self.clock.now();
        let snapshot = Snapshot {
            id: SnapshotId::new(),
            document_id: document.id,
            version,
            payload,
            kind,
            origin,
            is_current: true,
            base_version_id: Some(base),
            created_at: now,
            updated_at: now,
        };
        self.store
            .commit_snapshot(&SnapshotTransition {
                document_id: document.id,
                expected_current: current.id,
                snapshot: snapshot.clone(),
                at: now,
            })
            .await?;

        info!(
            document = %document.id,
            version,
            kind = kind.as_str(),
            "snapshot committed"
        );
        let change = match kind {
            VersionKind::Restore => ChangeKind::Restored,
            _ => ChangeKind::Saved,
        };
        self.publish(
            DocumentEvent::new(change, document.owner_id, document.id)
                .with_snapshot(snapshot.id, version)
                .at(now),
        );
        self.schedule_prune(document.id, document.owner_id);
        Ok(snapshot)
    }

    /// Version history, newest first, without payload bodies.
    pub async fn list_versions(&self, id: DocumentId) -> VersioningResult<Vec<VersionSummary>> {
        self.get_document(id).await?;
        let mut snapshots = self.store.list_snapshots(id).await?;
        snapshots.reverse();
        Ok(snapshots.iter().map(VersionSummary::from).collect())
    }

    pub async fn get_version(&self, id: DocumentId, version: i32) -> VersioningResult<Snapshot> {
        self.get_document(id).await?;
        self.store
            .list_snapshots(id)
            .await?
            .into_iter()
            .find(|s| s.version == version)
            .ok_or_else(|| VersioningError::not_found("version", format!("{id}@v{version}")))
    }

    pub async fn diff_versions(
        &self,
        id: DocumentId,
        from: i32,
        to: i32,
    ) -> VersioningResult<VersionDiff> {
        self.get_document(id).await?;
        let snapshots = self.store.list_snapshots(id).await?;
        let find = |version: i32| {
            snapshots
                .iter()
                .find(|s| s.version == version)
                .ok_or_else(|| VersioningError::not_found("version", format!("{id}@v{version}")))
        };
        Ok(diff_snapshots(find(from)?, find(to)?))
    }

    /// Drop the oldest non-current snapshots beyond `keep`.
    #[tracing::instrument(skip(self))]
    pub async fn prune(&self, id: DocumentId, keep: usize) -> VersioningResult<PruneReport> {
        let document = self.get_document(id).await?;
        prune_document(self.store.as_ref(), &self.events, &document, keep).await
    }

    /// Wait for background retention passes started by earlier saves.
    pub async fn settle_pruning(&self) {
        let pending: Vec<JoinHandle<()>> = self
            .pruning
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in pending {
            let _ = handle.await;
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_document(&self, id: DocumentId) -> VersioningResult<()> {
        let document = self.get_document(id).await?;
        if !self.store.delete_document(id).await? {
            return Err(VersioningError::not_found("document", id));
        }
        info!(document = %id, "document deleted");
        self.publish(
            DocumentEvent::new(ChangeKind::Deleted, document.owner_id, id).at(self.clock.now()),
        );
        Ok(())
    }

    fn schedule_prune(&self, document_id: DocumentId, owner_id: OwnerId) {
        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let keep = self.retention_keep;
        let handle = tokio::spawn(async move {
            let document = match store.get_document(document_id).await {
                Ok(Some(document)) => document,
                Ok(None) => return,
                Err(err) => {
                    warn!(document = %document_id, %owner_id, error = %err, "retention lookup failed");
                    return;
                }
            };
            if let Err(err) = prune_document(store.as_ref(), &events, &document, keep).await {
                warn!(document = %document_id, error = %err, "retention pass failed");
            }
        });

        let mut pending = self.pruning.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn publish(&self, event: DocumentEvent) {
        let delivered = self.events.publish(event);
        debug!(delivered, "change published");
    }
}

async fn prune_document(
    store: &dyn SnapshotStore,
    events: &EventBus,
    document: &Document,
    keep: usize,
) -> VersioningResult<PruneReport> {
    let report = store.prune_history(document.id, keep).await?;
    if report.deleted == 0 {
        return Ok(report);
    }
    info!(
        document = %document.id,
        deleted = report.deleted,
        relinked = report.relinked,
        "snapshots pruned"
    );
    events.publish(DocumentEvent::new(
        ChangeKind::Pruned,
        document.owner_id,
        document.id,
    ));
    Ok(report)
}
