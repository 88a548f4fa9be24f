use std::sync::Arc;

use docvault_core::events::EventBus;
use docvault_core::versioning::VersionManager;
use sqlx::PgPool;

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    manager: Arc<VersionManager>,
    config: AppConfig,
    /// Present when backed by PostgreSQL; used by the health check.
    pool: Option<PgPool>,
}

impl AppState {
    pub fn new(manager: Arc<VersionManager>, config: AppConfig, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(InnerState {
                manager,
                config,
                pool,
            }),
        }
    }

    pub fn manager(&self) -> &VersionManager {
        &self.inner.manager
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    pub fn event_bus(&self) -> &EventBus {
        self.inner.manager.events()
    }
}
