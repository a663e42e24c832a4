//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::EntityStore;
use crate::services::{DashboardService, RatingService, StoreService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services share one [`EntityStore`] handle,
/// so handlers never touch storage directly.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    ratings: RatingService,
    stores: StoreService,
    dashboard: DashboardService,
}

impl AppState {
    /// Create a new application state over an entity store.
    #[must_use]
    pub fn new(config: ServerConfig, entities: Arc<dyn EntityStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                ratings: RatingService::new(Arc::clone(&entities)),
                stores: StoreService::new(Arc::clone(&entities)),
                dashboard: DashboardService::new(entities),
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the rating service.
    #[must_use]
    pub fn ratings(&self) -> &RatingService {
        &self.inner.ratings
    }

    /// Get a reference to the store service.
    #[must_use]
    pub fn stores(&self) -> &StoreService {
        &self.inner.stores
    }

    /// Get a reference to the dashboard service.
    #[must_use]
    pub fn dashboard(&self) -> &DashboardService {
        &self.inner.dashboard
    }
}
