//! Integration tests for the order service.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests (no external services)
//! cargo test -p order-service-integration-tests
//!
//! # Postgres-backed tests (needs a migrated database)
//! DATABASE_URL=postgres://... cargo test -p order-service-integration-tests -- --ignored
//! ```
//!
//! # Support
//!
//! - [`InMemoryOrderStore`] - transactional fake store with failure injection
//! - [`ChannelSource`] - message source fed from a test
//! - [`fixtures`] - valid orders and payloads

pub mod fixtures;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use order_service::broker::{BrokerError, MessageSource};
use order_service::cache::OrderCache;
use order_service::db::{OrderReader, OrderWriter, RepositoryError};
use order_service_core::{Item, Order, OrderUid};
use tokio::sync::mpsc;

/// Where [`InMemoryOrderStore`] should fail the next writes or scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// Fail before the order row is staged.
    OrderInsert,
    /// Fail while staging the item at this index (after the order row).
    ItemInsert(usize),
    /// Fail after staging everything, at commit.
    Commit,
    /// Fail every read.
    Scan,
}

#[derive(Default)]
struct StoreInner {
    orders: BTreeMap<OrderUid, Order>,
    items: Vec<(OrderUid, Item)>,
    failure: Option<FailurePoint>,
    insert_calls: usize,
}

/// In-memory store with the same all-or-nothing contract as Postgres.
///
/// Each insert stages the order and its items locally and publishes them
/// only if every step succeeds, so an injected failure leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryOrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail at `point` until cleared.
    pub fn fail_at(&self, point: FailurePoint) {
        self.lock().failure = Some(point);
    }

    pub fn clear_failure(&self) {
        self.lock().failure = None;
    }

    /// Number of `insert_order_and_items` calls, failed ones included.
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    /// Number of committed orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    /// Number of committed item rows.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn injected(what: &str) -> RepositoryError {
    RepositoryError::Database(sqlx::Error::Protocol(format!("injected {what} failure")))
}

impl OrderWriter for InMemoryOrderStore {
    async fn insert_order_and_items(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        inner.insert_calls += 1;
        let failure = inner.failure;

        if failure == Some(FailurePoint::OrderInsert) {
            return Err(injected("order insert"));
        }
        if inner.orders.contains_key(&order.order_uid) {
            return Err(RepositoryError::Conflict(format!(
                "order {} already exists",
                order.order_uid
            )));
        }

        let staged_order = Order {
            items: Vec::new(),
            ..order.clone()
        };
        let mut staged_items = Vec::with_capacity(order.items.len());
        for (index, item) in order.items.iter().enumerate() {
            if failure == Some(FailurePoint::ItemInsert(index)) {
                return Err(injected("item insert"));
            }
            staged_items.push((order.order_uid.clone(), item.clone()));
        }

        if failure == Some(FailurePoint::Commit) {
            return Err(injected("commit"));
        }

        inner
            .orders
            .insert(staged_order.order_uid.clone(), staged_order);
        inner.items.extend(staged_items);
        Ok(())
    }
}

impl OrderReader for InMemoryOrderStore {
    async fn scan_all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.lock();
        if inner.failure == Some(FailurePoint::Scan) {
            return Err(injected("scan"));
        }
        Ok(inner.orders.values().cloned().collect())
    }

    async fn scan_all_items(&self) -> Result<Vec<(OrderUid, Item)>, RepositoryError> {
        let inner = self.lock();
        if inner.failure == Some(FailurePoint::Scan) {
            return Err(injected("scan"));
        }
        Ok(inner.items.clone())
    }

    async fn scan_order_by_id(&self, uid: &OrderUid) -> Result<Option<Order>, RepositoryError> {
        let inner = self.lock();
        if inner.failure == Some(FailurePoint::Scan) {
            return Err(injected("scan"));
        }
        let Some(order) = inner.orders.get(uid) else {
            return Ok(None);
        };

        let items = inner
            .items
            .iter()
            .filter(|(owner, _)| owner == uid)
            .map(|(_, item)| item.clone())
            .collect();
        Ok(Some(Order {
            items,
            ..order.clone()
        }))
    }
}

/// Sending half of a [`ChannelSource`].
pub type ChannelSender = mpsc::UnboundedSender<Result<Vec<u8>, BrokerError>>;

/// Message source backed by a channel. Ends when every sender is dropped.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<Vec<u8>, BrokerError>>,
}

impl ChannelSource {
    #[must_use]
    pub fn channel() -> (ChannelSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl MessageSource for ChannelSource {
    async fn next_message(&mut self) -> Option<Result<Vec<u8>, BrokerError>> {
        self.rx.recv().await
    }
}

/// Serialize the cache contents in uid order, for byte-level comparison.
///
/// # Panics
///
/// Panics if an order cannot be serialized.
#[must_use]
#[allow(clippy::expect_used)]
pub fn cache_bytes(cache: &OrderCache) -> Vec<u8> {
    let sorted: BTreeMap<_, _> = cache.snapshot().into_iter().collect();
    serde_json::to_vec(&sorted).expect("orders serialize")
}
