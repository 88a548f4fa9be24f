use std::sync::Arc;
use std::time::Duration;

use docvault_core::document::{OwnerId, SnapshotPayload};
use docvault_core::editor::{EditorCoordinator, SaveState};
use docvault_core::events::EventBus;
use docvault_core::store::MemoryStore;
use docvault_core::versioning::{NewDocument, VersionManager};

async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn followed_editor_picks_up_remote_saves_when_clean() {
    let manager = Arc::new(VersionManager::new(
        Arc::new(MemoryStore::new()),
        EventBus::new(64),
    ));
    let owner = OwnerId::new();
    let (doc, _) = manager
        .create_document(NewDocument::new(owner, "Shared", "v1"))
        .await
        .unwrap();

    let editor = EditorCoordinator::new(manager.clone(), Duration::from_secs(30));
    editor.request_switch(doc.id).await.unwrap();
    let subscription = editor.follow(owner);

    manager
        .save_draft(doc.id, SnapshotPayload::new("Shared", "from elsewhere"))
        .await
        .unwrap();
    assert!(
        eventually(|| {
            editor
                .draft()
                .is_some_and(|d| d.current.content == "from elsewhere")
        })
        .await
    );
    assert_eq!(editor.status().status, SaveState::Idle);

    editor.edit_content("mine");
    manager
        .save_draft(doc.id, SnapshotPayload::new("Shared", "again"))
        .await
        .unwrap();
    assert!(eventually(|| editor.status().remote_changed).await);
    assert_eq!(editor.draft().unwrap().current.content, "mine");

    subscription.unsubscribe();
    assert!(editor.close().abandoned_unsaved);
}
