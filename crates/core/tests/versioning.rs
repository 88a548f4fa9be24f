use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use docvault_core::clock::ManualClock;
use docvault_core::document::{
    DocumentMetadata, OwnerId, SnapshotPayload, ValidationError, VersionKind,
};
use docvault_core::events::EventBus;
use docvault_core::store::{MemoryStore, SnapshotStore};
use docvault_core::structured::{merge, PartialUpdate, StructuredDocument, Vocabulary};
use docvault_core::versioning::{AutosaveOutcome, BranchReason, NewDocument, VersionManager};
use docvault_core::VersioningError;

fn setup() -> (VersionManager, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::default());
    let manager = VersionManager::new(store.clone(), EventBus::new(256)).with_clock(clock.clone());
    (manager, store, clock)
}

#[tokio::test]
async fn versions_strictly_increase_across_saves_and_restores() {
    let (vm, store, _) = setup();
    let (doc, v1) = vm
        .create_document(NewDocument::new(OwnerId::new(), "Notes", "a"))
        .await
        .unwrap();

    let mut last = v1.version;
    for i in 0..6 {
        let snapshot = if i % 3 == 2 {
            vm.restore_version(v1.id).await.unwrap()
        } else {
            vm.save_draft(doc.id, SnapshotPayload::new("Notes", format!("edit {i}")))
                .await
                .unwrap()
        };
        assert!(snapshot.version > last);
        last = snapshot.version;
    }

    let snapshots = store.list_snapshots(doc.id).await.unwrap();
    let versions: HashSet<i32> = snapshots.iter().map(|s| s.version).collect();
    assert_eq!(versions.len(), snapshots.len());
    assert_eq!(snapshots.iter().filter(|s| s.is_current).count(), 1);
    assert_eq!(snapshots.last().unwrap().version, last);
    assert!(snapshots.last().unwrap().is_current);
}

#[tokio::test]
async fn pruning_keeps_current_and_resolves_every_base() {
    let (vm, store, _) = setup();
    let (doc, v1) = vm
        .create_document(NewDocument::new(OwnerId::new(), "Log", "0"))
        .await
        .unwrap();
    for i in 1..8 {
        vm.save_draft(doc.id, SnapshotPayload::new("Log", i.to_string()))
            .await
            .unwrap();
    }
    // Restored from a snapshot the prune below drops.
    vm.restore_version(v1.id).await.unwrap();
    vm.settle_pruning().await;
    let report = vm.prune(doc.id, 3).await.unwrap();
    assert!(report.deleted > 0);
    assert!(report.relinked > 0);

    let snapshots = store.list_snapshots(doc.id).await.unwrap();
    assert_eq!(snapshots.len(), 3);
    let current: Vec<_> = snapshots.iter().filter(|s| s.is_current).collect();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].version, 9);

    let ids: HashSet<_> = snapshots.iter().map(|s| s.id).collect();
    for snapshot in &snapshots {
        if let Some(base) = snapshot.base_version_id {
            assert!(ids.contains(&base), "dangling base on v{}", snapshot.version);
        }
    }
}

#[tokio::test]
async fn autosaves_inside_a_session_mutate_one_snapshot() {
    let (vm, store, clock) = setup();
    let (doc, _) = vm
        .create_document(NewDocument::new(OwnerId::new(), "Essay", ""))
        .await
        .unwrap();
    clock.advance(Duration::minutes(5));

    let first = vm
        .autosave(doc.id, SnapshotPayload::new("Essay", "draft one"))
        .await
        .unwrap();
    let second = vm
        .autosave(doc.id, SnapshotPayload::new("Essay", "draft two"))
        .await
        .unwrap();

    assert!(matches!(first, AutosaveOutcome::UpdatedInPlace { .. }));
    assert!(matches!(second, AutosaveOutcome::UpdatedInPlace { .. }));
    let snapshots = store.list_snapshots(doc.id).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].payload.content, "draft two");
}

#[tokio::test]
async fn autosave_after_the_session_lapses_branches() {
    let (vm, store, clock) = setup();
    let (doc, _) = vm
        .create_document(NewDocument::new(OwnerId::new(), "Essay", ""))
        .await
        .unwrap();
    clock.advance(Duration::minutes(31));

    let outcome = vm
        .autosave(doc.id, SnapshotPayload::new("Essay", "later"))
        .await
        .unwrap();
    match outcome {
        AutosaveOutcome::Created { snapshot, reason } => {
            assert_eq!(snapshot.version, 2);
            assert_eq!(reason, BranchReason::SessionExpired);
        }
        other => panic!("expected a new snapshot, got {other:?}"),
    }
    assert_eq!(store.list_snapshots(doc.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn generated_content_is_never_overwritten_by_autosave() {
    let (vm, _, _) = setup();
    let (doc, _) = vm
        .create_document(NewDocument::new(OwnerId::new(), "Pitch", ""))
        .await
        .unwrap();
    let generated = vm
        .record_generated(doc.id, SnapshotPayload::new("Pitch", "from the generator"))
        .await
        .unwrap();

    let outcome = vm
        .autosave(doc.id, SnapshotPayload::new("Pitch", "hand edit"))
        .await
        .unwrap();
    assert!(outcome.created_version());
    let history = vm.get_version(doc.id, generated.version).await.unwrap();
    assert_eq!(history.payload.content, "from the generator");
}

#[tokio::test]
async fn canvas_edit_session_then_restore() {
    let (vm, store, clock) = setup();
    let owner = OwnerId::new();
    let (doc, v1) = vm
        .create_document(
            NewDocument::new(owner, "Acme", r#"{"title":"Acme","problem":""}"#)
                .with_metadata(DocumentMetadata::structured()),
        )
        .await
        .unwrap();
    assert_eq!(v1.version, 1);

    // A single section widget edits `problem`.
    let vocab = Vocabulary::lean_canvas();
    let whole = StructuredDocument::parse(&v1.payload.content).unwrap();
    let merged = merge(&whole, &PartialUpdate::field("problem", "No budget"), &vocab).document;
    let outcome = vm
        .autosave(doc.id, SnapshotPayload::new("Acme", merged.to_json()))
        .await
        .unwrap();
    assert_eq!(outcome.snapshot().version, 1);
    let current = vm.current_snapshot(doc.id).await.unwrap();
    let content = StructuredDocument::parse(&current.payload.content).unwrap();
    assert_eq!(content.get("title"), Some("Acme"));
    assert_eq!(content.get("problem"), Some("No budget"));
    assert_eq!(content.len(), 2);

    clock.advance(Duration::minutes(31));
    let v2 = vm
        .autosave(
            doc.id,
            SnapshotPayload::new("Acme Inc", current.payload.content.clone()),
        )
        .await
        .unwrap()
        .into_snapshot();
    assert_eq!(v2.version, 2);
    let old = store.get_snapshot(v1.id).await.unwrap().unwrap();
    assert!(!old.is_current);

    let v3 = vm.restore_version(v1.id).await.unwrap();
    assert_eq!(v3.version, 3);
    assert_eq!(v3.kind, VersionKind::Restore);
    assert_eq!(v3.base_version_id, Some(v1.id));
    assert_eq!(v3.payload, old.payload);
    assert_eq!(vm.get_document(doc.id).await.unwrap().title, "Acme");
}

#[tokio::test]
async fn colliding_structured_keys_are_rejected() {
    let (vm, _, _) = setup();
    let err = vm
        .create_document(
            NewDocument::new(OwnerId::new(), "Dup", r#"{"key metrics":"a","Key_Metrics":"b"}"#)
                .with_metadata(DocumentMetadata::structured()),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VersioningError::Validation(ValidationError::CollidingKeys { .. })
    ));
}
