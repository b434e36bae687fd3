//! HTTP reads of orders that went through the ingestion pipeline.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use order_service::broker::{IngestionPipeline, MessageError};
use order_service::cache::OrderCache;
use order_service::routes;
use order_service::services::OrderService;
use order_service::state::AppState;
use order_service_core::{Order, OrderUid, Rule};
use order_service_integration_tests::fixtures::{item, order, order_with_items, payload};
use order_service_integration_tests::{ChannelSource, FailurePoint, InMemoryOrderStore};
use tower::ServiceExt;

struct Harness {
    store: InMemoryOrderStore,
    service: Arc<OrderService<InMemoryOrderStore>>,
    pipeline: IngestionPipeline<ChannelSource, InMemoryOrderStore>,
    app: Router,
}

fn harness() -> Harness {
    let store = InMemoryOrderStore::new();
    let service = Arc::new(OrderService::new(store.clone(), OrderCache::new()));
    let (_tx, source) = ChannelSource::channel();
    let pipeline = IngestionPipeline::new(source, Arc::clone(&service));
    let app = routes::routes().with_state(AppState::new(Arc::clone(&service)));
    Harness {
        store,
        service,
        pipeline,
        app,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_order(app: &Router, uid: &str) -> (StatusCode, Vec<u8>) {
    let uri = format!("/order/{}", urlencoding::encode(uid));
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_recover(app: &Router, uid: &str) -> (StatusCode, Vec<u8>) {
    let uri = format!("/admin/orders/{}/recover", urlencoding::encode(uid));
    send(app, Request::post(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn test_every_ingested_uid_is_readable() {
    let h = harness();
    let uids = [
        "b563feb7b2b84b6test".to_string(),
        "я".repeat(100),
        "я".repeat(OrderUid::MAX_LENGTH),
        "A 1".to_string(),
    ];

    for uid in &uids {
        let ingested = h
            .pipeline
            .handle_message(&payload(&order(uid)))
            .await
            .unwrap();
        assert_eq!(ingested.as_str(), uid);

        let (status, body) = get_order(&h.app, uid).await;
        assert_eq!(status, StatusCode::OK, "{uid}");
        let decoded: Order = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded.order_uid.as_str(), uid);
    }
}

#[tokio::test]
async fn test_padded_uid_is_rejected_on_both_paths() {
    let h = harness();

    let err = h
        .pipeline
        .handle_message(&payload(&order(" A1")))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MessageError::Validation { ref source, .. } if source.rule == Rule::Untrimmed
    ));
    assert_eq!(h.store.insert_calls(), 0);

    let (status, _) = get_order(&h.app, " A1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_padded_lookup_does_not_match_trimmed_uid() {
    let h = harness();
    h.pipeline
        .handle_message(&payload(&order("A1")))
        .await
        .unwrap();

    let (status, _) = get_order(&h.app, "A1 ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get_order(&h.app, "A1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_recover_route_loads_committed_order() {
    let h = harness();
    // Committed by another process; this cache never saw it
    OrderService::new(h.store.clone(), OrderCache::new())
        .ingest(order_with_items("A1", vec![item(7, 100)]))
        .await
        .unwrap();

    let (status, _) = get_order(&h.app, "A1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post_recover(&h.app, "A1").await;
    assert_eq!(status, StatusCode::OK);
    let recovered: Order = serde_json::from_slice(&body).unwrap();
    assert_eq!(recovered.items.len(), 1);

    let (status, _) = get_order(&h.app, "A1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.service.get_order("A1").is_some());
}

#[tokio::test]
async fn test_recover_route_unknown_order_is_not_found() {
    let h = harness();
    let (status, body) = post_recover(&h.app, "missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(String::from_utf8(body).unwrap(), "Not found: order missing");
    assert!(h.service.cache().is_empty());
}

#[tokio::test]
async fn test_recover_route_store_failure_is_internal_error() {
    let h = harness();
    h.store.fail_at(FailurePoint::Scan);

    let (status, body) = post_recover(&h.app, "A1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(String::from_utf8(body).unwrap(), "Internal server error");
}

#[tokio::test]
async fn test_recover_route_rejects_invalid_uid() {
    let h = harness();
    let (status, _) = post_recover(&h.app, " A1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
