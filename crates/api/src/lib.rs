//! HTTP surface for the document versioning engine.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;

/// The router with the middleware stack `main` serves.
pub fn app(state: state::AppState) -> Router {
    routes::build_router(state)
        .layer(middleware::request_tracing::trace_layer())
        .layer(middleware::cors::cors_layer())
}
