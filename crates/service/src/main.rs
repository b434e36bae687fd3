//! Order service binary.
//!
//! Serves cached orders over HTTP on port 8081 while consuming new orders
//! from Kafka in the background.
//!
//! # Startup
//!
//! 1. Load configuration, then initialize Sentry and tracing
//! 2. Connect to `PostgreSQL`
//! 3. Rehydrate the cache from the database (fatal on failure)
//! 4. Start the ingestion pipeline
//! 5. Serve HTTP until Ctrl+C or SIGTERM
//!
//! Migrations are not run here; use `order-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use order_service::cache::OrderCache;
use order_service::config::ServiceConfig;
use order_service::db::{self, PgOrderRepository};
use order_service::routes;
use order_service::services::OrderService;
use order_service::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServiceConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let config = ServiceConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "order_service=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database.url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let service = Arc::new(OrderService::new(
        PgOrderRepository::new(pool),
        OrderCache::new(),
    ));

    service
        .rehydrate()
        .await
        .expect("Failed to rehydrate order cache");

    let consumer = spawn_ingestion(&config, Arc::clone(&service));

    let state = AppState::new(Arc::clone(&service));

    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes::<PgOrderRepository>())
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("order service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    if let Some(consumer) = consumer {
        consumer.abort();
    }
    tracing::info!("Order service stopped");
}

/// Connect to the broker and run the ingestion pipeline on its own task.
#[cfg(feature = "kafka")]
fn spawn_ingestion(
    config: &ServiceConfig,
    service: Arc<OrderService<PgOrderRepository>>,
) -> Option<tokio::task::JoinHandle<()>> {
    use order_service::broker::{IngestionPipeline, KafkaSource};

    let source = KafkaSource::connect(&config.broker).expect("Failed to connect to Kafka");
    let pipeline = IngestionPipeline::new(source, service);

    Some(tokio::spawn(async move {
        let stats = pipeline.run().await;
        tracing::warn!(?stats, "Ingestion pipeline exited");
    }))
}

/// Without a broker client the service only serves what rehydration loaded.
#[cfg(not(feature = "kafka"))]
fn spawn_ingestion(
    _config: &ServiceConfig,
    _service: Arc<OrderService<PgOrderRepository>>,
) -> Option<tokio::task::JoinHandle<()>> {
    tracing::warn!("Built without the `kafka` feature; ingestion disabled");
    None
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1")
        .fetch_one(state.service().store().pool())
        .await
    {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
