use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SnapshotStore;
use crate::document::{Document, DocumentId, OwnerId, Snapshot, SnapshotId};
use crate::error::{VersioningError, VersioningResult};
use crate::mutation::{InPlaceUpdate, PrunePlan, PruneReport, SnapshotTransition};
use crate::versioning::retention::plan_prune;

#[derive(Debug, Default)]
struct Tables {
    documents: HashMap<DocumentId, Document>,
    snapshots: HashMap<SnapshotId, Snapshot>,
}

impl Tables {
    fn snapshots_of(&self, document: DocumentId) -> impl Iterator<Item = &Snapshot> {
        self.snapshots
            .values()
            .filter(move |s| s.document_id == document)
    }

    /// Relink, then delete. Nothing changes unless every survivor ends up
    /// with a base that outlives the pass.
    fn apply_plan(&mut self, plan: &PrunePlan) -> VersioningResult<()> {
        let doomed: HashSet<SnapshotId> = plan.deletions.iter().copied().collect();
        for id in &doomed {
            match self.snapshots.get(id) {
                Some(s) if s.document_id != plan.document_id => {
                    return Err(VersioningError::InvariantViolation(format!(
                        "snapshot {id} belongs to another document"
                    )));
                }
                Some(s) if s.is_current => {
                    return Err(VersioningError::InvariantViolation(format!(
                        "refusing to prune current snapshot {id}"
                    )));
                }
                _ => {}
            }
        }

        let relinks: HashMap<SnapshotId, Option<SnapshotId>> = plan
            .relinks
            .iter()
            .map(|r| (r.snapshot_id, r.new_base))
            .collect();
        for survivor in self
            .snapshots_of(plan.document_id)
            .filter(|s| !doomed.contains(&s.id))
        {
            let base = relinks
                .get(&survivor.id)
                .copied()
                .unwrap_or(survivor.base_version_id);
            if base.is_some_and(|b| doomed.contains(&b)) {
                return Err(VersioningError::InvariantViolation(format!(
                    "snapshot {} would keep a pruned base",
                    survivor.id
                )));
            }
        }

        for (id, new_base) in relinks {
            if let Some(s) = self.snapshots.get_mut(&id) {
                s.base_version_id = new_base;
            }
        }
        self.snapshots.retain(|id, _| !doomed.contains(id));
        Ok(())
    }
}

/// Process-local store. Backs tests and single-node deployments without a
/// database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a persistence error until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> VersioningResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(VersioningError::Persistence(
                "memory store is refusing writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn insert_document(
        &self,
        document: &Document,
        initial: &Snapshot,
    ) -> VersioningResult<()> {
        self.check_writable()?;
        if !initial.is_current
            || initial.document_id != document.id
            || document.current_snapshot_id != Some(initial.id)
        {
            return Err(VersioningError::InvariantViolation(
                "initial snapshot must be the document's current snapshot".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        if tables.documents.contains_key(&document.id) {
            return Err(VersioningError::InvariantViolation(format!(
                "document {} already exists",
                document.id
            )));
        }
        tables.documents.insert(document.id, document.clone());
        tables.snapshots.insert(initial.id, initial.clone());
        Ok(())
    }

    async fn get_document(&self, id: DocumentId) -> VersioningResult<Option<Document>> {
        Ok(self.tables.read().await.documents.get(&id).cloned())
    }

    async fn list_documents(&self, owner: OwnerId) -> VersioningResult<Vec<Document>> {
        let tables = self.tables.read().await;
        let mut docs: Vec<Document> = tables
            .documents
            .values()
            .filter(|d| d.owner_id == owner)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }

    async fn delete_document(&self, id: DocumentId) -> VersioningResult<bool> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let existed = tables.documents.remove(&id).is_some();
        tables.snapshots.retain(|_, s| s.document_id != id);
        Ok(existed)
    }

    async fn get_snapshot(&self, id: SnapshotId) -> VersioningResult<Option<Snapshot>> {
        Ok(self.tables.read().await.snapshots.get(&id).cloned())
    }

    async fn list_snapshots(&self, document: DocumentId) -> VersioningResult<Vec<Snapshot>> {
        let tables = self.tables.read().await;
        let mut snapshots: Vec<Snapshot> = tables.snapshots_of(document).cloned().collect();
        snapshots.sort_by_key(|s| s.version);
        Ok(snapshots)
    }

    async fn commit_snapshot(&self, transition: &SnapshotTransition) -> VersioningResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;

        let document = tables
            .documents
            .get(&transition.document_id)
            .ok_or_else(|| VersioningError::not_found("document", transition.document_id))?;
        if document.current_snapshot_id != Some(transition.expected_current) {
            return Err(VersioningError::InvariantViolation(format!(
                "document {} no longer points at snapshot {}",
                transition.document_id, transition.expected_current
            )));
        }
        let new = &transition.snapshot;
        if !new.is_current || new.document_id != transition.document_id {
            return Err(VersioningError::InvariantViolation(
                "committed snapshot must be current and belong to the document".to_string(),
            ));
        }
        if tables
            .snapshots_of(transition.document_id)
            .any(|s| s.version >= new.version)
        {
            return Err(VersioningError::InvariantViolation(format!(
                "version {} is not above every existing version",
                new.version
            )));
        }

        if let Some(previous) = tables.snapshots.get_mut(&transition.expected_current) {
            previous.is_current = false;
        }
        tables.snapshots.insert(new.id, new.clone());
        if let Some(document) = tables.documents.get_mut(&transition.document_id) {
            document.title = new.payload.title.clone();
            document.current_snapshot_id = Some(new.id);
            document.updated_at = transition.at;
        }
        Ok(())
    }

    async fn update_in_place(&self, update: &InPlaceUpdate) -> VersioningResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;

        let current = tables
            .documents
            .get(&update.document_id)
            .ok_or_else(|| VersioningError::not_found("document", update.document_id))?
            .current_snapshot_id;
        if current != Some(update.snapshot_id) {
            return Err(VersioningError::InvariantViolation(format!(
                "snapshot {} is not current",
                update.snapshot_id
            )));
        }

        let snapshot = tables
            .snapshots
            .get_mut(&update.snapshot_id)
            .ok_or_else(|| VersioningError::not_found("snapshot", update.snapshot_id))?;
        snapshot.payload = update.payload.clone();
        snapshot.updated_at = update.at;
        if let Some(document) = tables.documents.get_mut(&update.document_id) {
            document.title = update.payload.title.clone();
            document.updated_at = update.at;
        }
        Ok(())
    }

    async fn prune_history(
        &self,
        document: DocumentId,
        keep: usize,
    ) -> VersioningResult<PruneReport> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if !tables.documents.contains_key(&document) {
            return Err(VersioningError::not_found("document", document));
        }

        let mut history: Vec<Snapshot> = tables.snapshots_of(document).cloned().collect();
        history.sort_by_key(|s| s.version);
        let Some(plan) = plan_prune(document, &history, keep) else {
            return Ok(PruneReport {
                remaining: history.len(),
                ..Default::default()
            });
        };

        tables.apply_plan(&plan)?;
        Ok(PruneReport {
            deleted: plan.deletions.len(),
            relinked: plan.relinks.len(),
            remaining: history.len() - plan.deletions.len(),
        })
    }
}
