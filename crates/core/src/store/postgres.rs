use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::SnapshotStore;
use crate::document::{
    Document, DocumentId, DocumentMetadata, OwnerId, Snapshot, SnapshotId, SnapshotOrigin,
    SnapshotPayload, VersionKind,
};
use crate::error::{VersioningError, VersioningResult};
use crate::mutation::{InPlaceUpdate, PruneReport, SnapshotTransition};
use crate::versioning::retention::plan_prune;

/// Column list for documents queries.
const DOCUMENT_COLUMNS: &str =
    "id, owner_id, title, doc_type, current_snapshot_id, metadata, created_at, updated_at";

/// Column list for snapshots queries.
const SNAPSHOT_COLUMNS: &str = "id, document_id, version, title, content, kind, origin, \
     is_current, base_version_id, created_at, updated_at";

/// Database row representation of a document.
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    doc_type: String,
    current_snapshot_id: Option<Uuid>,
    metadata: Json<DocumentMetadata>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id.into(),
            owner_id: row.owner_id.into(),
            title: row.title,
            doc_type: row.doc_type,
            current_snapshot_id: row.current_snapshot_id.map(SnapshotId::from),
            metadata: row.metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row representation of a snapshot.
#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: Uuid,
    document_id: Uuid,
    version: i32,
    title: String,
    content: String,
    kind: String,
    origin: String,
    is_current: bool,
    base_version_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = VersioningError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let kind = VersionKind::parse(&row.kind).ok_or_else(|| {
            VersioningError::Persistence(format!("unknown snapshot kind {:?}", row.kind))
        })?;
        let origin = SnapshotOrigin::parse(&row.origin).ok_or_else(|| {
            VersioningError::Persistence(format!("unknown snapshot origin {:?}", row.origin))
        })?;
        Ok(Self {
            id: row.id.into(),
            document_id: row.document_id.into(),
            version: row.version,
            payload: SnapshotPayload {
                title: row.title,
                content: row.content,
            },
            kind,
            origin,
            is_current: row.is_current,
            base_version_id: row.base_version_id.map(SnapshotId::from),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lock the document row and return its current snapshot pointer.
    async fn lock_current(
        tx: &mut Transaction<'_, Postgres>,
        document: DocumentId,
    ) -> VersioningResult<Option<Uuid>> {
        let row: Option<(Option<Uuid>,)> =
            sqlx::query_as("SELECT current_snapshot_id FROM documents WHERE id = $1 FOR UPDATE")
                .bind(document.as_uuid())
                .fetch_optional(&mut **tx)
                .await?;
        row.map(|(current,)| current)
            .ok_or_else(|| VersioningError::not_found("document", document))
    }

    async fn insert_snapshot(
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &Snapshot,
    ) -> VersioningResult<()> {
        let query = format!(
            "INSERT INTO snapshots ({SNAPSHOT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&query)
            .bind(snapshot.id.as_uuid())
            .bind(snapshot.document_id.as_uuid())
            .bind(snapshot.version)
            .bind(&snapshot.payload.title)
            .bind(&snapshot.payload.content)
            .bind(snapshot.kind.as_str())
            .bind(snapshot.origin.as_str())
            .bind(snapshot.is_current)
            .bind(snapshot.base_version_id.map(|id| id.as_uuid()))
            .bind(snapshot.created_at)
            .bind(snapshot.updated_at)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PostgresStore {
    async fn insert_document(
        &self,
        document: &Document,
        initial: &Snapshot,
    ) -> VersioningResult<()> {
        if !initial.is_current || document.current_snapshot_id != Some(initial.id) {
            return Err(VersioningError::InvariantViolation(
                "initial snapshot must be the document's current snapshot".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        // The pointer is set after the snapshot row exists.
        let query = format!(
            "INSERT INTO documents ({DOCUMENT_COLUMNS})
             VALUES ($1, $2, $3, $4, NULL, $5, $6, $7)"
        );
        sqlx::query(&query)
            .bind(document.id.as_uuid())
            .bind(document.owner_id.as_uuid())
            .bind(&document.title)
            .bind(&document.doc_type)
            .bind(Json(&document.metadata))
            .bind(document.created_at)
            .bind(document.updated_at)
            .execute(&mut *tx)
            .await?;
        Self::insert_snapshot(&mut tx, initial).await?;
        sqlx::query("UPDATE documents SET current_snapshot_id = $2 WHERE id = $1")
            .bind(document.id.as_uuid())
            .bind(initial.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_document(&self, id: DocumentId) -> VersioningResult<Option<Document>> {
        let query = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Document::from))
    }

    async fn list_documents(&self, owner: OwnerId) -> VersioningResult<Vec<Document>> {
        let query = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE owner_id = $1
             ORDER BY updated_at DESC"
        );
        let rows = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(owner.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn delete_document(&self, id: DocumentId) -> VersioningResult<bool> {
        // Snapshots go with the document via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_snapshot(&self, id: SnapshotId) -> VersioningResult<Option<Snapshot>> {
        let query = format!("SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE id = $1");
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Snapshot::try_from)
            .transpose()
    }

    async fn list_snapshots(&self, document: DocumentId) -> VersioningResult<Vec<Snapshot>> {
        let query = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
             WHERE document_id = $1
             ORDER BY version ASC"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(document.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Snapshot::try_from)
            .collect()
    }

    async fn commit_snapshot(&self, transition: &SnapshotTransition) -> VersioningResult<()> {
        let new = &transition.snapshot;
        if !new.is_current || new.document_id != transition.document_id {
            return Err(VersioningError::InvariantViolation(
                "committed snapshot must be current and belong to the document".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let current = Self::lock_current(&mut tx, transition.document_id).await?;
        if current != Some(transition.expected_current.as_uuid()) {
            return Err(VersioningError::InvariantViolation(format!(
                "document {} no longer points at snapshot {}",
                transition.document_id, transition.expected_current
            )));
        }
        let (max_version,): (Option<i32>,) =
            sqlx::query_as("SELECT MAX(version) FROM snapshots WHERE document_id = $1")
                .bind(transition.document_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        if max_version.is_some_and(|max| max >= new.version) {
            return Err(VersioningError::InvariantViolation(format!(
                "version {} is not above every existing version",
                new.version
            )));
        }

        sqlx::query("UPDATE snapshots SET is_current = FALSE WHERE id = $1")
            .bind(transition.expected_current.as_uuid())
            .execute(&mut *tx)
            .await?;
        Self::insert_snapshot(&mut tx, new).await?;
        sqlx::query(
            "UPDATE documents SET title = $2, current_snapshot_id = $3, updated_at = $4
             WHERE id = $1",
        )
        .bind(transition.document_id.as_uuid())
        .bind(&new.payload.title)
        .bind(new.id.as_uuid())
        .bind(transition.at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_in_place(&self, update: &InPlaceUpdate) -> VersioningResult<()> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_current(&mut tx, update.document_id).await?;
        if current != Some(update.snapshot_id.as_uuid()) {
            return Err(VersioningError::InvariantViolation(format!(
                "snapshot {} is not current",
                update.snapshot_id
            )));
        }

        sqlx::query(
            "UPDATE snapshots SET title = $2, content = $3, updated_at = $4
             WHERE id = $1",
        )
        .bind(update.snapshot_id.as_uuid())
        .bind(&update.payload.title)
        .bind(&update.payload.content)
        .bind(update.at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE documents SET title = $2, updated_at = $3 WHERE id = $1")
            .bind(update.document_id.as_uuid())
            .bind(&update.payload.title)
            .bind(update.at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn prune_history(
        &self,
        document: DocumentId,
        keep: usize,
    ) -> VersioningResult<PruneReport> {
        let mut tx = self.pool.begin().await?;
        // Commits take the same row lock, so the history read below stays
        // valid until this transaction ends.
        Self::lock_current(&mut tx, document).await?;

        let query = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
             WHERE document_id = $1
             ORDER BY version ASC"
        );
        let history = sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(document.as_uuid())
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(Snapshot::try_from)
            .collect::<VersioningResult<Vec<_>>>()?;

        let Some(plan) = plan_prune(document, &history, keep) else {
            return Ok(PruneReport {
                remaining: history.len(),
                ..Default::default()
            });
        };

        for relink in &plan.relinks {
            sqlx::query(
                "UPDATE snapshots SET base_version_id = $3
                 WHERE id = $1 AND document_id = $2",
            )
            .bind(relink.snapshot_id.as_uuid())
            .bind(document.as_uuid())
            .bind(relink.new_base.map(|id| id.as_uuid()))
            .execute(&mut *tx)
            .await?;
        }
        let deletions: Vec<Uuid> = plan.deletions.iter().map(|id| id.as_uuid()).collect();
        let deleted = sqlx::query(
            "DELETE FROM snapshots
             WHERE document_id = $1 AND id = ANY($2) AND is_current = FALSE",
        )
        .bind(document.as_uuid())
        .bind(&deletions)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if deleted as usize != deletions.len() {
            return Err(VersioningError::InvariantViolation(format!(
                "prune of {document} removed {deleted} of {} snapshots",
                deletions.len()
            )));
        }
        tx.commit().await?;

        Ok(PruneReport {
            deleted: plan.deletions.len(),
            relinked: plan.relinks.len(),
            remaining: history.len() - plan.deletions.len(),
        })
    }
}
