//! Application state shared across handlers.

use std::sync::Arc;

use crate::cache::OrderCache;
use crate::db::PgOrderRepository;
use crate::services::OrderService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable. Holds the same [`OrderService`] the ingestion
/// pipeline writes through, so lookups see every committed order.
pub struct AppState<S = PgOrderRepository> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    service: Arc<OrderService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> AppState<S> {
    /// Create a new application state.
    #[must_use]
    pub fn new(service: Arc<OrderService<S>>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service }),
        }
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn service(&self) -> &OrderService<S> {
        &self.inner.service
    }

    /// Get a reference to the order cache.
    #[must_use]
    pub fn cache(&self) -> &OrderCache {
        self.inner.service.cache()
    }
}
