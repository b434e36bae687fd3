//! Durable store for orders (`PostgreSQL`).
//!
//! # Tables
//!
//! - `orders` - One row per order; `delivery` and `payment` as JSONB
//! - `items` - One row per item, referencing `orders.order_uid`
//!
//! # Capabilities
//!
//! The orchestrator depends on two narrow traits rather than on the
//! database client, so it can be driven by an in-memory store in tests:
//!
//! - [`OrderWriter`] - the single transactional write
//! - [`OrderReader`] - the scans used by rehydration and recovery
//!
//! # Migrations
//!
//! Migrations are stored in `crates/service/migrations/` and run via:
//! ```bash
//! cargo run -p order-service-cli -- migrate
//! ```

pub mod orders;

use std::future::Future;
use std::time::Duration;

use order_service_core::{Item, Order, OrderUid};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use orders::PgOrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Constraint violation (e.g., duplicate order uid).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Transactional write capability.
pub trait OrderWriter: Send + Sync {
    /// Insert an order row and all of its item rows in one transaction.
    ///
    /// Either every row is committed or none is. A committed insert is
    /// visible to any subsequent scan.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order uid already exists,
    /// `RepositoryError::Database` for any other failure.
    fn insert_order_and_items(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Scan capability used for cache rehydration and administrative recovery.
pub trait OrderReader: Send + Sync {
    /// All orders, each with an empty `items` list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the scan fails.
    fn scan_all_orders(&self) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// All items paired with their owning order uid, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the scan fails.
    fn scan_all_items(
        &self,
    ) -> impl Future<Output = Result<Vec<(OrderUid, Item)>, RepositoryError>> + Send;

    /// One order with its items, or `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    fn scan_order_by_id(
        &self,
        uid: &OrderUid,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
