/// Write-time validation of document payloads.
use thiserror::Error;

use super::model::{DocumentMetadata, SnapshotPayload};
use crate::structured::document::{StructuredDocument, StructuredError};
use crate::structured::keys::find_collision;
use crate::structured::merge::DELETION_MARKER;

pub const MAX_TITLE_CHARS: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document type cannot be empty")]
    EmptyDocType,
    #[error("title exceeds {MAX_TITLE_CHARS} characters")]
    TitleTooLong,
    #[error("structured content is invalid: {0}")]
    InvalidStructuredContent(#[from] StructuredError),
    #[error("structured keys {first:?} and {second:?} collide after normalization")]
    CollidingKeys { first: String, second: String },
    #[error("structured key {0:?} is reserved")]
    ReservedKey(String),
}

pub fn validate_doc_type(doc_type: &str) -> Result<(), ValidationError> {
    if doc_type.trim().is_empty() {
        return Err(ValidationError::EmptyDocType);
    }
    Ok(())
}

/// Validate a payload about to be written under the given metadata.
///
/// Structured payloads must parse as a flat string map, must not carry the
/// deletion marker, and must not contain two keys that normalize to the same
/// form (the merge engine could not address either of them unambiguously).
pub fn validate_payload(
    metadata: &DocumentMetadata,
    payload: &SnapshotPayload,
) -> Result<(), ValidationError> {
    if payload.title.chars().count() > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong);
    }
    if !metadata.is_structured() {
        return Ok(());
    }

    let doc = StructuredDocument::parse(&payload.content)?;
    if doc.contains_key(DELETION_MARKER) {
        return Err(ValidationError::ReservedKey(DELETION_MARKER.to_string()));
    }
    if let Some((first, second)) = find_collision(doc.keys()) {
        return Err(ValidationError::CollidingKeys {
            first: first.to_string(),
            second: second.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(content: &str) -> (DocumentMetadata, SnapshotPayload) {
        (
            DocumentMetadata::structured(),
            SnapshotPayload::new("Canvas", content),
        )
    }

    #[test]
    fn free_text_is_not_parsed() {
        let payload = SnapshotPayload::new("Notes", "{not json");
        assert!(validate_payload(&DocumentMetadata::default(), &payload).is_ok());
    }

    #[test]
    fn accepts_flat_structured_content() {
        let (meta, payload) = structured(r#"{"title":"Acme","problem":""}"#);
        assert!(validate_payload(&meta, &payload).is_ok());
    }

    #[test]
    fn rejects_malformed_structured_content() {
        let (meta, payload) = structured("[1, 2]");
        assert!(matches!(
            validate_payload(&meta, &payload),
            Err(ValidationError::InvalidStructuredContent(_))
        ));
    }

    #[test]
    fn rejects_colliding_keys() {
        let (meta, payload) = structured(r#"{"Key Metrics":"a","key_metrics":"b"}"#);
        assert!(matches!(
            validate_payload(&meta, &payload),
            Err(ValidationError::CollidingKeys { .. })
        ));
    }

    #[test]
    fn rejects_deletion_marker() {
        let content = format!(r#"{{"title":"T","{DELETION_MARKER}":"true"}}"#);
        let (meta, payload) = structured(&content);
        assert_eq!(
            validate_payload(&meta, &payload),
            Err(ValidationError::ReservedKey(DELETION_MARKER.to_string()))
        );
    }

    #[test]
    fn rejects_long_titles() {
        let payload = SnapshotPayload::new("x".repeat(MAX_TITLE_CHARS + 1), "");
        assert_eq!(
            validate_payload(&DocumentMetadata::default(), &payload),
            Err(ValidationError::TitleTooLong)
        );
    }

    #[test]
    fn rejects_blank_doc_type() {
        assert_eq!(validate_doc_type("  "), Err(ValidationError::EmptyDocType));
        assert!(validate_doc_type("canvas").is_ok());
    }
}
