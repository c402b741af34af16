use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use cache_cell::{create_cache_router, CacheConsistencyService, CacheError, CacheKey, MemoryEdgeCache};
use monitoring_cell::{AlertManagerService, AlertSeverity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    status: String,
}

fn snapshot(status: &str) -> Snapshot {
    Snapshot {
        status: status.to_string(),
    }
}

fn service(edge: Arc<MemoryEdgeCache>, alerts: Arc<AlertManagerService>) -> CacheConsistencyService {
    CacheConsistencyService::new(edge, Duration::from_secs(300), Duration::from_secs(30), alerts)
}

async fn read(
    cache: &CacheConsistencyService,
    key: &CacheKey,
    source: &Arc<tokio::sync::Mutex<Snapshot>>,
    loads: &Arc<AtomicU32>,
) -> Snapshot {
    let source = source.clone();
    let loads = loads.clone();
    cache
        .get_or_populate(key, || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>(source.lock().await.clone())
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_repeated_reads_hit_the_cache() {
    let cache = service(Arc::new(MemoryEdgeCache::new()), Arc::new(AlertManagerService::new()));
    let source = Arc::new(tokio::sync::Mutex::new(snapshot("reserved")));
    let loads = Arc::new(AtomicU32::new(0));
    let key = CacheKey::Dashboard("P1".into());

    assert_eq!(read(&cache, &key, &source, &loads).await, snapshot("reserved"));
    assert_eq!(read(&cache, &key, &source, &loads).await, snapshot("reserved"));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_read_after_invalidate_sees_the_committed_write() {
    let cache = service(Arc::new(MemoryEdgeCache::new()), Arc::new(AlertManagerService::new()));
    let source = Arc::new(tokio::sync::Mutex::new(snapshot("reserved")));
    let loads = Arc::new(AtomicU32::new(0));
    let key = CacheKey::Dashboard("P1".into());

    read(&cache, &key, &source, &loads).await;

    *source.lock().await = snapshot("approved");
    cache.invalidate("P1").await.unwrap();

    assert_eq!(read(&cache, &key, &source, &loads).await, snapshot("approved"));
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_snapshot_loaded_before_a_write_is_not_cached() {
    let cache = Arc::new(service(Arc::new(MemoryEdgeCache::new()), Arc::new(AlertManagerService::new())));
    let key = CacheKey::Reorders("P2".into());

    // The loader reads the old state, then a writer commits and invalidates
    // before the loader's result is stored.
    let writer = cache.clone();
    let stale: Snapshot = cache
        .get_or_populate(&key, || async move {
            let old = snapshot("pending");
            writer.invalidate("P2").await?;
            Ok::<_, CacheError>(old)
        })
        .await
        .unwrap();
    assert_eq!(stale, snapshot("pending"));

    let fresh: Snapshot = cache
        .get_or_populate(&key, || async { Ok::<_, CacheError>(snapshot("confirmed")) })
        .await
        .unwrap();
    assert_eq!(fresh, snapshot("confirmed"));
}

#[tokio::test]
async fn test_invalidation_reaches_other_processes_local_tier() {
    let edge = Arc::new(MemoryEdgeCache::new());
    let alerts = Arc::new(AlertManagerService::new());
    let replica_a = service(edge.clone(), alerts.clone());
    let replica_b = service(edge, alerts);

    let source = Arc::new(tokio::sync::Mutex::new(snapshot("paid")));
    let loads = Arc::new(AtomicU32::new(0));
    let key = CacheKey::Dashboard("P3".into());

    read(&replica_b, &key, &source, &loads).await;
    read(&replica_b, &key, &source, &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    *source.lock().await = snapshot("shipped");
    replica_a.invalidate("P3").await.unwrap();

    assert_eq!(read(&replica_b, &key, &source, &loads).await, snapshot("shipped"));
}

#[tokio::test]
async fn test_failed_invalidation_raises_a_critical_alert() {
    let edge = Arc::new(MemoryEdgeCache::new());
    let alerts = Arc::new(AlertManagerService::new());
    let cache = service(edge.clone(), alerts.clone());

    edge.set_failure(true);
    let result = cache.invalidate("P4").await;

    assert_matches!(result, Err(CacheError::InvalidationFailed { ref patient_id, .. }) if patient_id == "P4");
    let active = alerts.get_active_alerts().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].severity, AlertSeverity::Critical);
    assert_eq!(active[0].patient_id.as_deref(), Some("P4"));
    assert!(active[0].tags["keys"].contains("dashboard:P4"));
    assert!(active[0].tags.contains_key("edge_error"));
}

#[tokio::test]
async fn test_reads_fall_back_to_the_loader_when_the_edge_is_down() {
    let edge = Arc::new(MemoryEdgeCache::new());
    let cache = service(edge.clone(), Arc::new(AlertManagerService::new()));
    let source = Arc::new(tokio::sync::Mutex::new(snapshot("reserved")));
    let loads = Arc::new(AtomicU32::new(0));
    let key = CacheKey::Dashboard("P5".into());

    edge.set_failure(true);
    read(&cache, &key, &source, &loads).await;
    read(&cache, &key, &source, &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_operator_endpoint_clears_both_tiers() {
    let cache = Arc::new(service(Arc::new(MemoryEdgeCache::new()), Arc::new(AlertManagerService::new())));
    let source = Arc::new(tokio::sync::Mutex::new(snapshot("reserved")));
    let loads = Arc::new(AtomicU32::new(0));
    let key = CacheKey::Dashboard("P6".into());
    read(&cache, &key, &source, &loads).await;

    let response = create_cache_router(cache.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cache/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"patient_id":"P6"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["ok"], true);

    read(&cache, &key, &source, &loads).await;
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_operator_endpoint_requires_patient_id() {
    let cache = Arc::new(service(Arc::new(MemoryEdgeCache::new()), Arc::new(AlertManagerService::new())));
    let response = create_cache_router(cache)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cache/invalidate")
                .header("content-type", "application/json")
                .body(Body::from(r#"{}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
