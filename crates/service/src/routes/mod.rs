//! HTTP route handlers for the order service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database reachable)
//! GET  /order/{order_uid}               - Cached order as JSON, 404 if not cached
//! POST /admin/orders/{order_uid}/recover - Reload one order from the database into the cache
//! GET  /*                               - Static lookup page
//! ```
//!
//! Health routes and the static fallback are mounted by the binary. The
//! admin route has no authentication; bind the service to an internal
//! address (the default is `127.0.0.1`).

pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::db::{OrderReader, OrderWriter};
use crate::state::AppState;

/// Create all API routes for the order service.
pub fn routes<S>() -> Router<AppState<S>>
where
    S: OrderWriter + OrderReader + 'static,
{
    Router::new()
        .route("/order/{order_uid}", get(orders::show::<S>))
        .route(
            "/admin/orders/{order_uid}/recover",
            post(orders::recover::<S>),
        )
}
