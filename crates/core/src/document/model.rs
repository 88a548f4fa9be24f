use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::{DocumentId, OwnerId, SnapshotId};

/// How a document's `content` string is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    /// Free text, possibly markdown.
    #[default]
    Markdown,
    /// A flat `{key: string}` JSON object (see `structured`).
    Json,
    Html,
}

/// Metadata bag attached to a document.
///
/// The fields the versioning engine branches on are typed; anything else a
/// client attaches is carried through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_format: Option<ContentFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DocumentMetadata {
    pub fn structured() -> Self {
        Self {
            content_format: Some(ContentFormat::Json),
            ..Default::default()
        }
    }

    pub fn format(&self) -> ContentFormat {
        self.content_format.unwrap_or_default()
    }

    pub fn is_structured(&self) -> bool {
        self.format() == ContentFormat::Json
    }
}

/// The mutable document shell. Content lives in its snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: OwnerId,
    pub title: String,
    /// Routing tag for whichever client renders the document. Opaque here.
    pub doc_type: String,
    pub current_snapshot_id: Option<SnapshotId>,
    pub metadata: DocumentMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `{title, content}` pair a snapshot freezes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub title: String,
    pub content: String,
}

impl SnapshotPayload {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Why a snapshot was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Initial,
    Update,
    Restore,
}

impl VersionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionKind::Initial => "initial",
            VersionKind::Update => "update",
            VersionKind::Restore => "restore",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "initial" => Some(VersionKind::Initial),
            "update" => Some(VersionKind::Update),
            "restore" => Some(VersionKind::Restore),
            _ => None,
        }
    }
}

/// Who produced a snapshot's payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotOrigin {
    #[default]
    Human,
    /// Written by a generator. Never overwritten in place.
    Automated,
}

impl SnapshotOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotOrigin::Human => "human",
            SnapshotOrigin::Automated => "automated",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "human" => Some(SnapshotOrigin::Human),
            "automated" => Some(SnapshotOrigin::Automated),
            _ => None,
        }
    }
}

/// One immutable version of a document.
///
/// The only mutation a snapshot ever sees after insert is an in-place payload
/// rewrite while it is still current and inside its editing session, plus the
/// `is_current` flip when a successor is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: SnapshotId,
    pub document_id: DocumentId,
    pub version: i32,
    pub payload: SnapshotPayload,
    pub kind: VersionKind,
    pub origin: SnapshotOrigin,
    pub is_current: bool,
    pub base_version_id: Option<SnapshotId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn is_automated(&self) -> bool {
        self.origin == SnapshotOrigin::Automated
    }

    pub fn summary(&self) -> VersionSummary {
        VersionSummary::from(self)
    }
}

/// Version listing entry, without the payload body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: SnapshotId,
    pub version: i32,
    pub title: String,
    pub kind: VersionKind,
    pub origin: SnapshotOrigin,
    pub is_current: bool,
    pub base_version_id: Option<SnapshotId>,
    pub content_length: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Snapshot> for VersionSummary {
    fn from(s: &Snapshot) -> Self {
        Self {
            id: s.id,
            version: s.version,
            title: s.payload.title.clone(),
            kind: s.kind,
            origin: s.origin,
            is_current: s.is_current,
            base_version_id: s.base_version_id,
            content_length: s.payload.content.chars().count(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}
