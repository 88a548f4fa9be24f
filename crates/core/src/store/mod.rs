//! Durable storage for documents and their snapshots.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::document::{Document, DocumentId, OwnerId, Snapshot, SnapshotId};
use crate::error::VersioningResult;
use crate::mutation::{InPlaceUpdate, PruneReport, SnapshotTransition};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Append-only snapshot table plus the document shells pointing into it.
///
/// Every write method is atomic. Implementations check the single-current
/// invariant before writing and answer a violation with
/// [`VersioningError::InvariantViolation`](crate::error::VersioningError)
/// without touching anything.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert a document together with its first, current snapshot.
    async fn insert_document(&self, document: &Document, initial: &Snapshot)
        -> VersioningResult<()>;

    async fn get_document(&self, id: DocumentId) -> VersioningResult<Option<Document>>;

    /// Documents owned by `owner`, most recently updated first.
    async fn list_documents(&self, owner: OwnerId) -> VersioningResult<Vec<Document>>;

    /// Delete a document and all of its snapshots. Returns whether it existed.
    async fn delete_document(&self, id: DocumentId) -> VersioningResult<bool>;

    async fn get_snapshot(&self, id: SnapshotId) -> VersioningResult<Option<Snapshot>>;

    /// All snapshots of a document, oldest (lowest version) first.
    async fn list_snapshots(&self, document: DocumentId) -> VersioningResult<Vec<Snapshot>>;

    /// Retire the expected current snapshot, insert the new one and re-point
    /// the document at it (also taking over its title).
    async fn commit_snapshot(&self, transition: &SnapshotTransition) -> VersioningResult<()>;

    /// Rewrite the current snapshot's payload and the document title.
    async fn update_in_place(&self, update: &InPlaceUpdate) -> VersioningResult<()>;

    /// Keep the newest `keep` snapshots (and always the current one).
    ///
    /// The pass is planned with
    /// [`plan_prune`](crate::versioning::retention::plan_prune) while the
    /// document is locked against commits, then applied in the same
    /// critical section.
    async fn prune_history(&self, document: DocumentId, keep: usize)
        -> VersioningResult<PruneReport>;
}
