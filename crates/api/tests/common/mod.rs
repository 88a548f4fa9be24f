use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use docvault_api::config::AppConfig;
use docvault_api::state::AppState;
use docvault_core::events::EventBus;
use docvault_core::store::MemoryStore;
use docvault_core::versioning::VersionManager;

/// Full application router over an in-memory store.
pub fn build_test_app() -> Router {
    let manager = Arc::new(VersionManager::new(
        Arc::new(MemoryStore::new()),
        EventBus::new(64),
    ));
    docvault_api::app(AppState::new(manager, AppConfig::default(), None))
}

/// Send one request and parse the JSON body (`Value::Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
