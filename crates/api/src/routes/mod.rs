pub mod documents;
pub mod health;
pub mod merge;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config().body_limit_bytes;
    Router::new()
        .merge(health::routes())
        .merge(documents::routes())
        .merge(merge::routes())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
