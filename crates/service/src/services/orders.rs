//! Write-through order service.
//!
//! The service is the only writer to the cache and enforces one ordering:
//! persist first, cache second. An order is visible in the cache only after
//! its transaction has committed. If the process dies between commit and
//! upsert, the order reappears on the next startup rehydration.

use std::collections::HashMap;
use std::sync::Arc;

use order_service_core::{Order, OrderUid};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cache::OrderCache;
use crate::db::{OrderReader, OrderWriter, RepositoryError};

/// Errors returned by [`OrderService`].
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// The transactional write failed and was rolled back.
    #[error("failed to persist order: {0}")]
    Persistence(RepositoryError),

    /// An order with this uid is already committed.
    #[error("order {0} already exists")]
    Duplicate(OrderUid),

    /// Reading the store for rehydration or recovery failed.
    #[error("failed to scan orders: {0}")]
    Scan(RepositoryError),
}

/// Orchestrates persistence and caching of orders.
pub struct OrderService<S> {
    store: S,
    cache: OrderCache,
}

impl<S> OrderService<S> {
    /// Create a new order service over a store and a cache.
    #[must_use]
    pub const fn new(store: S, cache: OrderCache) -> Self {
        Self { store, cache }
    }

    /// The cache this service writes to.
    #[must_use]
    pub const fn cache(&self) -> &OrderCache {
        &self.cache
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S> OrderService<S>
where
    S: OrderWriter + OrderReader,
{
    /// Rebuild the cache from the durable store.
    ///
    /// Scans all orders and all items, attaches each item to its order in
    /// scan order, and swaps the result into the cache in one step. Items
    /// whose order is missing from the scan are skipped. An empty store
    /// yields an empty cache. Returns the number of cached orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Scan` if either scan fails; the cache is
    /// left untouched.
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> Result<usize, OrderServiceError> {
        let orders = self
            .store
            .scan_all_orders()
            .await
            .map_err(OrderServiceError::Scan)?;
        let items = self
            .store
            .scan_all_items()
            .await
            .map_err(OrderServiceError::Scan)?;

        let mut by_uid: HashMap<OrderUid, Order> = orders
            .into_iter()
            .map(|order| (order.order_uid.clone(), order))
            .collect();

        let mut orphaned = 0_usize;
        for (uid, item) in items {
            match by_uid.get_mut(&uid) {
                Some(order) => order.items.push(item),
                None => orphaned += 1,
            }
        }
        if orphaned > 0 {
            warn!(orphaned, "Skipped items without a matching order");
        }

        let loaded = self.cache.load_snapshot(by_uid.into_values());
        info!(orders = loaded, "Cache rehydrated from database");
        Ok(loaded)
    }

    /// Persist an order and, once committed, cache it.
    ///
    /// The order is expected to be validated already. On any error the
    /// cache is not touched.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Duplicate` if the uid is already stored,
    /// `OrderServiceError::Persistence` if the transaction failed.
    #[instrument(skip(self, order), fields(order_uid = %order.order_uid))]
    pub async fn ingest(&self, order: Order) -> Result<(), OrderServiceError> {
        match self.store.insert_order_and_items(&order).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                return Err(OrderServiceError::Duplicate(order.order_uid));
            }
            Err(e) => return Err(OrderServiceError::Persistence(e)),
        }

        let items = order.items.len();
        self.cache.upsert(order);
        debug!(items, "Order committed and cached");
        Ok(())
    }

    /// Look up an order in the cache. Never consults the store.
    #[must_use]
    pub fn get_order(&self, uid: &str) -> Option<Arc<Order>> {
        self.cache.get(uid)
    }

    /// Re-read a single order from the store and cache it if present.
    ///
    /// Administrative repair for the crash window between commit and cache
    /// update; not used on the read path.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Scan` if the store query fails.
    #[instrument(skip(self), fields(order_uid = %uid))]
    pub async fn recover(&self, uid: &OrderUid) -> Result<Option<Arc<Order>>, OrderServiceError> {
        let Some(order) = self
            .store
            .scan_order_by_id(uid)
            .await
            .map_err(OrderServiceError::Scan)?
        else {
            return Ok(None);
        };

        self.cache.upsert(order);
        info!("Order recovered from database");
        Ok(self.cache.get(uid.as_str()))
    }
}
