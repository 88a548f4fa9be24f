//! Decide whether an autosave folds into the current snapshot or opens a
//! new one.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BranchReason {
    /// The current snapshot was written by a generator.
    AutomatedOrigin,
    /// The editing session that produced the current snapshot has lapsed.
    SessionExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "camelCase")]
pub enum AutosaveDecision {
    UpdateInPlace,
    NewSnapshot(BranchReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::minutes(30),
        }
    }
}

impl SessionPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn decide(&self, current: &Snapshot, now: DateTime<Utc>) -> AutosaveDecision {
        if current.is_automated() {
            return AutosaveDecision::NewSnapshot(BranchReason::AutomatedOrigin);
        }
        if now - current.created_at > self.timeout {
            return AutosaveDecision::NewSnapshot(BranchReason::SessionExpired);
        }
        AutosaveDecision::UpdateInPlace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        DocumentId, SnapshotId, SnapshotOrigin, SnapshotPayload, VersionKind,
    };

    fn snapshot(age: Duration, origin: SnapshotOrigin, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            id: SnapshotId::new(),
            document_id: DocumentId::new(),
            version: 3,
            payload: SnapshotPayload::default(),
            kind: VersionKind::Update,
            origin,
            is_current: true,
            base_version_id: None,
            created_at: now - age,
            updated_at: now - age,
        }
    }

    #[test]
    fn fresh_human_snapshot_updates_in_place() {
        let now = Utc::now();
        let policy = SessionPolicy::default();
        let s = snapshot(Duration::minutes(5), SnapshotOrigin::Human, now);
        assert_eq!(policy.decide(&s, now), AutosaveDecision::UpdateInPlace);
    }

    #[test]
    fn lapsed_session_branches() {
        let now = Utc::now();
        let policy = SessionPolicy::default();
        let s = snapshot(Duration::minutes(31), SnapshotOrigin::Human, now);
        assert_eq!(
            policy.decide(&s, now),
            AutosaveDecision::NewSnapshot(BranchReason::SessionExpired)
        );
    }

    #[test]
    fn exactly_at_timeout_is_still_the_same_session() {
        let now = Utc::now();
        let policy = SessionPolicy::default();
        let s = snapshot(Duration::minutes(30), SnapshotOrigin::Human, now);
        assert_eq!(policy.decide(&s, now), AutosaveDecision::UpdateInPlace);
    }

    #[test]
    fn automated_snapshot_always_branches() {
        let now = Utc::now();
        let policy = SessionPolicy::default();
        let s = snapshot(Duration::seconds(1), SnapshotOrigin::Automated, now);
        assert_eq!(
            policy.decide(&s, now),
            AutosaveDecision::NewSnapshot(BranchReason::AutomatedOrigin)
        );
    }

    #[test]
    fn custom_timeout() {
        let now = Utc::now();
        let policy = SessionPolicy::new(Duration::minutes(2));
        let s = snapshot(Duration::minutes(3), SnapshotOrigin::Human, now);
        assert!(matches!(policy.decide(&s, now), AutosaveDecision::NewSnapshot(_)));
    }
}
