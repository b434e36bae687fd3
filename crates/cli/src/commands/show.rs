//! Print one order straight from the database.
//!
//! Bypasses the service's cache, so it also finds orders that were
//! committed but never cached (e.g. a crash between commit and cache
//! update). Exits with an error if the order does not exist.

use order_service::config::{ConfigError, DatabaseConfig};
use order_service::db::{self, OrderReader, PgOrderRepository, RepositoryError};
use order_service_core::OrderUid;
use thiserror::Error;

/// Errors that can occur while fetching an order.
#[derive(Debug, Error)]
pub enum ShowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Order not found: {0}")]
    NotFound(OrderUid),

    #[error("Failed to encode order: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fetch `order_uid` with its items and print it as pretty JSON.
pub async fn run(order_uid: &str) -> Result<(), ShowError> {
    let database = DatabaseConfig::from_env()?;
    let pool = db::create_pool(&database.url).await?;
    let repo = PgOrderRepository::new(pool);

    let uid = OrderUid::new(order_uid.trim());
    let Some(order) = repo.scan_order_by_id(&uid).await? else {
        return Err(ShowError::NotFound(uid));
    };

    let json = serde_json::to_string_pretty(&order)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }

    Ok(())
}
