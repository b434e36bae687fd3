//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! order-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! Same resolution as the service: `ORDER_SERVICE_DATABASE_URL`, then
//! `DATABASE_URL`, then `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/`DB_NAME`.
//!
//! # Migration Files
//!
//! Embedded at build time from `crates/service/migrations/`.

use order_service::config::{ConfigError, DatabaseConfig};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let database = DatabaseConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database.url.expose_secret()).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../service/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
