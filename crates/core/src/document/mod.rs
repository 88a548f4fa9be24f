pub mod id;
pub mod model;
pub mod validate;

pub use id::{DocumentId, OwnerId, SnapshotId};
pub use validate::ValidationError;
pub use model::{
    ContentFormat, Document, DocumentMetadata, Snapshot, SnapshotOrigin, SnapshotPayload,
    VersionKind, VersionSummary,
};
