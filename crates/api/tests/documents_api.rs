mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{build_test_app, send};

async fn create(app: &axum::Router, owner: Uuid, title: &str, content: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/v1/documents",
        Some(json!({ "ownerId": owner, "title": title, "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn ping_and_health_report_ok() {
    let app = build_test_app();
    let (status, body) = send(&app, Method::GET, "/v1/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn create_then_fetch_document() {
    let app = build_test_app();
    let owner = Uuid::new_v4();
    let created = create(&app, owner, "Plan", "first draft").await;
    assert_eq!(created["snapshot"]["version"], 1);
    assert_eq!(created["snapshot"]["kind"], "initial");

    let id = created["document"]["id"].as_str().unwrap();
    let (status, body) = send(&app, Method::GET, &format!("/v1/documents/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document"]["title"], "Plan");
    assert_eq!(body["snapshot"]["payload"]["content"], "first draft");

    let (status, body) = send(&app, Method::GET, &format!("/v1/documents?owner={owner}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn save_restore_and_history() {
    let app = build_test_app();
    let created = create(&app, Uuid::new_v4(), "Plan", "one\n").await;
    let id = created["document"]["id"].as_str().unwrap();

    let (status, v2) = send(
        &app,
        Method::POST,
        &format!("/v1/documents/{id}/save"),
        Some(json!({ "title": "Plan", "content": "one\ntwo\n" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(v2["version"], 2);

    let (status, v3) = send(
        &app,
        Method::POST,
        &format!("/v1/documents/{id}/versions/1/restore"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(v3["version"], 3);
    assert_eq!(v3["kind"], "restore");
    assert_eq!(v3["baseVersionId"], created["snapshot"]["id"]);
    assert_eq!(v3["payload"]["content"], "one\n");

    let (status, history) = send(&app, Method::GET, &format!("/v1/documents/{id}/versions"), None).await;
    assert_eq!(status, StatusCode::OK);
    let versions: Vec<i64> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["version"].as_i64().unwrap())
        .collect();
    assert_eq!(versions, vec![3, 2, 1]);

    let (status, diff) = send(
        &app,
        Method::GET,
        &format!("/v1/documents/{id}/diff?from=1&to=2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(diff["insertions"], 1);
    assert_eq!(diff["deletions"], 0);
}

#[tokio::test]
async fn autosave_within_session_updates_in_place() {
    let app = build_test_app();
    let created = create(&app, Uuid::new_v4(), "Notes", "").await;
    let id = created["document"]["id"].as_str().unwrap();

    for content in ["a", "ab"] {
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/v1/documents/{id}/autosave"),
            Some(json!({ "title": "Notes", "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "updatedInPlace");
        assert_eq!(body["snapshot"]["version"], 1);
    }
}

#[tokio::test]
async fn prune_keeps_the_current_snapshot() {
    let app = build_test_app();
    let created = create(&app, Uuid::new_v4(), "Log", "0").await;
    let id = created["document"]["id"].as_str().unwrap();
    for i in 1..5 {
        send(
            &app,
            Method::POST,
            &format!("/v1/documents/{id}/save"),
            Some(json!({ "title": "Log", "content": i.to_string() })),
        )
        .await;
    }

    let (status, report) = send(
        &app,
        Method::POST,
        &format!("/v1/documents/{id}/prune?keep=2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["deleted"], 3);
    assert_eq!(report["remaining"], 2);

    let (_, current) = send(&app, Method::GET, &format!("/v1/documents/{id}"), None).await;
    assert_eq!(current["snapshot"]["version"], 5);
}

#[tokio::test]
async fn delete_removes_document() {
    let app = build_test_app();
    let created = create(&app, Uuid::new_v4(), "Gone", "").await;
    let id = created["document"]["id"].as_str().unwrap();

    let (status, _) = send(&app, Method::DELETE, &format!("/v1/documents/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, Method::GET, &format!("/v1/documents/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "notFound");
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = build_test_app();
    let (status, _) = send(&app, Method::GET, "/v1/documents/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/documents",
        Some(json!({
            "ownerId": Uuid::new_v4(),
            "title": "Canvas",
            "content": "{\"Notes\":\"a\",\"notes\":\"b\"}",
            "metadata": { "contentFormat": "json" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation");
}

#[tokio::test]
async fn merge_helper_guards_protected_sections() {
    let app = build_test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/merge",
        Some(json!({
            "previous": { "title": "T", "problem": "P", "extra": "E" },
            "update": { "title": "T" },
            "shape": "view",
            "canvasType": "lean",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "applied");
    assert_eq!(body["document"], json!({ "title": "T", "problem": "P" }));
    assert_eq!(body["sections"]["special"], json!({ "title": "T" }));
    assert_eq!(body["sections"]["domain"], json!({ "problem": "P" }));
    assert_eq!(body["sections"]["cards"], json!({}));
}

#[tokio::test]
async fn merge_helper_refuses_two_spellings_of_a_new_card() {
    let app = build_test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/merge",
        Some(json!({
            "previous": { "title": "T" },
            "update": { "title": "T", "New Card": "1", "new_card": "2" },
            "shape": "view",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unchanged");
    assert_eq!(body["document"], json!({ "title": "T" }));
    assert_eq!(body["sections"]["special"], json!({ "title": "T" }));
}
