use axum::{extract::State, routing::get, Json, Router};
use docvault_core::VersioningError;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Full health check. Verifies database connectivity when backed by
/// PostgreSQL.
async fn health_check(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let store = match state.pool() {
        Some(pool) => {
            sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map_err(VersioningError::from)?;
            "postgres"
        }
        None => "memory",
    };

    Ok(Json(json!({
        "status": "ok",
        "store": store,
        "subscribers": state.event_bus().subscriber_count(),
    })))
}

/// Lightweight ping; touches nothing.
async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
