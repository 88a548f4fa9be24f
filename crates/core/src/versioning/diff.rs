//! Line diffs between two snapshot payloads.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use crate::document::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDiff {
    pub from_version: i32,
    pub to_version: i32,
    pub title_changed: bool,
    pub insertions: usize,
    pub deletions: usize,
    /// Unified diff of the content bodies.
    pub unified: String,
}

impl VersionDiff {
    pub fn is_identical(&self) -> bool {
        !self.title_changed && self.insertions == 0 && self.deletions == 0
    }
}

pub fn diff_snapshots(from: &Snapshot, to: &Snapshot) -> VersionDiff {
    let diff = TextDiff::from_lines(&from.payload.content, &to.payload.content);

    let (mut insertions, mut deletions) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => insertions += 1,
            ChangeTag::Delete => deletions += 1,
            ChangeTag::Equal => {}
        }
    }

    let unified = diff
        .unified_diff()
        .context_radius(3)
        .header(&format!("v{}", from.version), &format!("v{}", to.version))
        .to_string();

    VersionDiff {
        from_version: from.version,
        to_version: to.version,
        title_changed: from.payload.title != to.payload.title,
        insertions,
        deletions,
        unified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        DocumentId, SnapshotId, SnapshotOrigin, SnapshotPayload, VersionKind,
    };
    use chrono::Utc;

    fn snap(version: i32, title: &str, content: &str) -> Snapshot {
        Snapshot {
            id: SnapshotId::new(),
            document_id: DocumentId::new(),
            version,
            payload: SnapshotPayload::new(title, content),
            kind: VersionKind::Update,
            origin: SnapshotOrigin::Human,
            is_current: false,
            base_version_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn counts_line_changes() {
        let a = snap(1, "T", "one\ntwo\nthree\n");
        let b = snap(2, "T", "one\n2\nthree\nfour\n");
        let d = diff_snapshots(&a, &b);
        assert_eq!(d.insertions, 2);
        assert_eq!(d.deletions, 1);
        assert!(!d.title_changed);
        assert!(d.unified.contains("--- v1"));
        assert!(d.unified.contains("+++ v2"));
        assert!(d.unified.contains("+four"));
    }

    #[test]
    fn identical_payloads() {
        let a = snap(1, "T", "same\n");
        let b = snap(3, "T", "same\n");
        assert!(diff_snapshots(&a, &b).is_identical());
    }

    #[test]
    fn title_only_change() {
        let a = snap(1, "Acme", "");
        let b = snap(2, "Acme Inc", "");
        let d = diff_snapshots(&a, &b);
        assert!(d.title_changed);
        assert!(!d.is_identical());
    }
}
