//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KAFKA_BROKER` - Broker address (e.g., localhost:9092)
//! - `KAFKA_TOPIC` - Topic carrying order messages
//! - One of:
//!   - `ORDER_SERVICE_DATABASE_URL` - `PostgreSQL` connection string
//!   - `DATABASE_URL` - Generic fallback
//!   - `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` - Composed
//!     into a connection string
//!
//! ## Optional
//! - `KAFKA_GROUP_ID` - Consumer group id (default: order-service)
//! - `KAFKA_PARTITION` - Partition to consume (default: 0)
//! - `ORDER_SERVICE_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDER_SERVICE_PORT` - Listen port (default: 8081)
//! - `ORDER_SERVICE_STATIC_DIR` - Static files (default: crates/service/static)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Order service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Durable store connection
    pub database: DatabaseConfig,
    /// Broker subscription
    pub broker: BrokerConfig,
    /// IP address to bind the HTTP server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory served as the router fallback
    pub static_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 - 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry performance traces sample rate (0.0 - 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub url: SecretString,
}

/// Broker subscription configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Bootstrap broker address
    pub broker: String,
    /// Topic carrying order messages
    pub topic: String,
    /// Consumer group id
    pub group_id: String,
    /// The single partition consumed
    pub partition: i32,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&env_lookup)
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_lookup(lookup)?;
        let broker = BrokerConfig::from_lookup(lookup)?;
        let host = parse_env(lookup, "ORDER_SERVICE_HOST", "127.0.0.1")?;
        let port = parse_env(lookup, "ORDER_SERVICE_PORT", "8081")?;
        let static_dir = PathBuf::from(get_env_or_default(
            lookup,
            "ORDER_SERVICE_STATIC_DIR",
            "crates/service/static",
        ));
        let sentry_dsn = lookup("SENTRY_DSN");
        let sentry_environment = lookup("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = lookup("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = lookup("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database,
            broker,
            host,
            port,
            static_dir,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl DatabaseConfig {
    /// Load only the database settings (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no database URL can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&env_lookup)
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Explicit URL first, then the generic one, then the DB_* parts
        if let Some(url) = lookup("ORDER_SERVICE_DATABASE_URL").or_else(|| lookup("DATABASE_URL"))
        {
            return Ok(Self {
                url: SecretString::from(url),
            });
        }

        let host = get_required_env(lookup, "DB_HOST")?;
        let port: u16 = parse_required_env(lookup, "DB_PORT")?;
        let user = get_required_env(lookup, "DB_USER")?;
        let password = get_required_env(lookup, "DB_PASSWORD")?;
        let name = get_required_env(lookup, "DB_NAME")?;

        let url = format!(
            "postgres://{}:{}@{host}:{port}/{name}?sslmode=disable",
            urlencoding::encode(&user),
            urlencoding::encode(&password),
        );

        Ok(Self {
            url: SecretString::from(url),
        })
    }
}

impl BrokerConfig {
    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            broker: get_required_env(lookup, "KAFKA_BROKER")?,
            topic: get_required_env(lookup, "KAFKA_TOPIC")?,
            group_id: get_env_or_default(lookup, "KAFKA_GROUP_ID", "order-service"),
            partition: parse_env(lookup, "KAFKA_PARTITION", "0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get a required variable.
fn get_required_env(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn get_env_or_default(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to a default string.
fn parse_env<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(lookup, key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a required variable.
fn parse_required_env<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_required_env(lookup, key)?
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
