mod common;

use std::sync::Arc;

use assert_matches::assert_matches;

use cache_cell::{CacheConsistencyService, CacheError};
use monitoring_cell::AlertSeverity;
use shared_models::clinic::ReviewStatus;
use shared_utils::test_utils::TestConfig;
use visit_cell::models::DoctorActionRequest;
use visit_cell::{DashboardService, VisitError, VisitLifecycleService, VisitStage};

use common::{harness, intake_request, reserve_request, reviewable_visit};

#[tokio::test]
async fn test_dashboard_reflects_each_acknowledged_write() {
    let h = harness().await;

    h.state.visits.submit_intake(intake_request("P400")).await.unwrap();
    let view = h.state.dashboards.get_dashboard("P400").await.unwrap();
    assert_eq!(view.stage, Some(VisitStage::Submitted));

    let booked = h.state.visits.reserve(reserve_request("P400", 2, 10, 0)).await.unwrap();
    let view = h.state.dashboards.get_dashboard("P400").await.unwrap();
    assert_eq!(view.stage, Some(VisitStage::Reserved));

    h.state
        .visits
        .record_doctor_action(DoctorActionRequest {
            reserve_id: Some(booked.reservation.reserve_id.clone()),
            status: Some(ReviewStatus::Ok),
            ..DoctorActionRequest::default()
        })
        .await
        .unwrap();
    let view = h.state.dashboards.get_dashboard("P400").await.unwrap();
    assert_eq!(view.stage, Some(VisitStage::Approved));
    assert!(!view.no_answer);

    assert!(h.state.dashboards.get_reorders("P400").await.unwrap().reorders.is_empty());
    let reorder = h.state.reorders.create("P400", "MJ_5").await.unwrap();
    let reorders = h.state.dashboards.get_reorders("P400").await.unwrap();
    assert_eq!(reorders.reorders.len(), 1);
    assert_eq!(reorders.reorders[0].reorder_id, reorder.reorder_id);

    let view = h.state.dashboards.get_dashboard("P400").await.unwrap();
    assert_eq!(view.stage, Some(VisitStage::ReorderRequested));
}

#[tokio::test]
async fn test_no_answer_flag_is_visible_on_the_dashboard() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P401").await;
    h.state.dashboards.get_dashboard("P401").await.unwrap();

    h.state
        .visits
        .record_doctor_action(DoctorActionRequest {
            reserve_id: Some(reserve_id),
            call_status: Some(shared_models::clinic::CallStatus::NoAnswer),
            ..DoctorActionRequest::default()
        })
        .await
        .unwrap();

    let view = h.state.dashboards.get_dashboard("P401").await.unwrap();
    assert!(view.no_answer);
    assert_eq!(view.stage, Some(VisitStage::Reserved));
}

#[tokio::test]
async fn test_another_replica_sees_writes_made_here() {
    let h = harness().await;
    let config = TestConfig::default().to_arc();
    let replica_cache = Arc::new(CacheConsistencyService::new(
        h.edge.clone(),
        config.edge_cache_ttl(),
        config.local_cache_ttl(),
        h.alerts.clone(),
    ));
    let replica = DashboardService::new(
        h.store.clone(),
        replica_cache,
        VisitLifecycleService::new(config.clinic_offset()),
    );

    let reserve_id = reviewable_visit(&h, "P402").await;
    assert_eq!(
        replica.get_dashboard("P402").await.unwrap().stage,
        Some(VisitStage::Reserved)
    );

    h.state
        .visits
        .record_doctor_action(DoctorActionRequest {
            reserve_id: Some(reserve_id),
            status: Some(ReviewStatus::Ng),
            ..DoctorActionRequest::default()
        })
        .await
        .unwrap();

    assert_eq!(
        replica.get_dashboard("P402").await.unwrap().stage,
        Some(VisitStage::Rejected)
    );
}

#[tokio::test]
async fn test_unknown_patient_is_not_found() {
    let h = harness().await;
    let result = h.state.dashboards.get_dashboard("P499").await;
    assert_matches!(result, Err(VisitError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_invalidation_fails_the_write_and_alerts() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P403").await;
    h.edge.set_failure(true);

    let result = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            reserve_id: Some(reserve_id),
            status: Some(ReviewStatus::Ok),
            ..DoctorActionRequest::default()
        })
        .await;

    assert_matches!(result, Err(VisitError::Cache(CacheError::InvalidationFailed { .. })));
    let alerts = h.alerts.get_active_alerts().await;
    assert!(alerts
        .iter()
        .any(|a| a.severity == AlertSeverity::Critical && a.patient_id.as_deref() == Some("P403")));
}
