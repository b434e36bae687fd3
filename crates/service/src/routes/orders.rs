//! Order routes.
//!
//! Lookups are served from the in-memory cache only. An order committed to
//! the database but absent from the cache is reported as not found until
//! the next rehydration or an explicit recovery.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use order_service_core::{Order, OrderUid, validate_uid};
use tracing::{debug, instrument};

use crate::db::{OrderReader, OrderWriter};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Accept exactly the uids the ingest validator accepts, unmodified.
fn parse_uid(raw: &str) -> Result<OrderUid> {
    validate_uid(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(OrderUid::new(raw))
}

/// Return the cached order with the given uid.
///
/// # Errors
///
/// `BadRequest` for a uid the validator would reject, `NotFound` on a
/// cache miss.
#[instrument(skip(state))]
pub async fn show<S>(
    State(state): State<AppState<S>>,
    Path(order_uid): Path<String>,
) -> Result<Json<Arc<Order>>>
where
    S: OrderWriter + OrderReader + 'static,
{
    let uid = parse_uid(&order_uid)?;

    let Some(order) = state.cache().get(uid.as_str()) else {
        debug!("Cache miss");
        return Err(AppError::NotFound(format!("order {uid}")));
    };

    Ok(Json(order))
}

/// Reload one order from the database into the cache and return it.
///
/// Repairs an order committed just before a crash that the cache missed,
/// without restarting the service.
///
/// # Errors
///
/// `BadRequest` for an invalid uid, `NotFound` if the database has no such
/// order, `Internal` if the database query fails.
#[instrument(skip(state))]
pub async fn recover<S>(
    State(state): State<AppState<S>>,
    Path(order_uid): Path<String>,
) -> Result<Json<Arc<Order>>>
where
    S: OrderWriter + OrderReader + 'static,
{
    let uid = parse_uid(&order_uid)?;

    match state.service().recover(&uid).await {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(AppError::NotFound(format!("order {uid}"))),
        Err(e) => Err(AppError::Internal(format!(
            "failed to recover order {uid}: {e}"
        ))),
    }
}
