mod common;

use assert_matches::assert_matches;
use futures::future::join;

use shared_database::{ClinicStore, LegacyOperation};
use shared_models::clinic::{CallStatus, ReviewStatus};
use sync_cell::SyncOutcome;
use visit_cell::models::DoctorActionRequest;
use visit_cell::VisitError;

use common::{harness, intake_request, reviewable_visit};

fn action(reserve_id: &str) -> DoctorActionRequest {
    DoctorActionRequest {
        reserve_id: Some(reserve_id.to_string()),
        ..DoctorActionRequest::default()
    }
}

#[tokio::test]
async fn test_decision_clears_no_answer_in_one_write() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P200").await;

    let unreachable = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            call_status: Some(CallStatus::NoAnswer),
            ..action(&reserve_id)
        })
        .await
        .unwrap();
    assert_eq!(unreachable.intake.call_status, CallStatus::NoAnswer);
    let flagged_at = unreachable.intake.call_status_updated_at.unwrap();

    let decided = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            status: Some(ReviewStatus::Ok),
            note: Some("prescribe 5mg".to_string()),
            menu: Some("MJ_5".to_string()),
            ..action(&reserve_id)
        })
        .await
        .unwrap();

    assert_eq!(decided.intake.status, ReviewStatus::Ok);
    assert_eq!(decided.intake.call_status, CallStatus::Unset);
    assert!(decided.intake.call_status_updated_at.unwrap() >= flagged_at);
    assert!(decided.intake.reviewed_at.is_some());
    assert_eq!(decided.intake.prescription_menu.as_deref(), Some("MJ_5"));

    let stored = h.store.find_intake_by_reserve_id(&reserve_id).await.unwrap().unwrap();
    assert_eq!(stored, decided.intake);
    assert_eq!(h.legacy.calls_of("doctor_update").await, 2);
}

#[tokio::test]
async fn test_no_answer_after_a_decision_is_rejected() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P201").await;

    h.state
        .visits
        .record_doctor_action(DoctorActionRequest {
            status: Some(ReviewStatus::Ng),
            ..action(&reserve_id)
        })
        .await
        .unwrap();

    let result = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            call_status: Some(CallStatus::NoAnswer),
            ..action(&reserve_id)
        })
        .await;
    assert_matches!(result, Err(VisitError::InvalidTransition(_)));

    let stored = h.store.find_intake_by_reserve_id(&reserve_id).await.unwrap().unwrap();
    assert_eq!((stored.status, stored.call_status), (ReviewStatus::Ng, CallStatus::Unset));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_actions_never_leave_a_decided_visit_flagged() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P202").await;

    let no_answer = h.state.visits.record_doctor_action(DoctorActionRequest {
        call_status: Some(CallStatus::NoAnswer),
        ..action(&reserve_id)
    });
    let approve = h.state.visits.record_doctor_action(DoctorActionRequest {
        status: Some(ReviewStatus::Ok),
        ..action(&reserve_id)
    });
    let (_, approved) = join(no_answer, approve).await;
    approved.unwrap();

    let stored = h.store.find_intake_by_reserve_id(&reserve_id).await.unwrap().unwrap();
    assert_eq!((stored.status, stored.call_status), (ReviewStatus::Ok, CallStatus::Unset));
}

#[tokio::test]
async fn test_unknown_reservation_creates_nothing() {
    let h = harness().await;

    let result = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            status: Some(ReviewStatus::Ok),
            ..action("no-such-reservation")
        })
        .await;

    assert_matches!(result, Err(VisitError::NoMatchingVisit(_)));
    assert_eq!(h.store.reservation_count().await, 0);
    assert!(h.legacy.calls().await.is_empty());
}

#[tokio::test]
async fn test_intake_without_reservation_is_not_reviewable() {
    let h = harness().await;
    h.state.visits.submit_intake(intake_request("P203")).await.unwrap();

    let result = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            patient_id: Some("P203".to_string()),
            status: Some(ReviewStatus::Ok),
            ..DoctorActionRequest::default()
        })
        .await;

    assert_matches!(result, Err(VisitError::NoMatchingVisit(_)));
    let stored = h.store.find_intake_by_patient("P203").await.unwrap().unwrap();
    assert_eq!(stored.status, ReviewStatus::Unset);
}

#[tokio::test]
async fn test_canceled_reservation_is_not_reviewable() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P204").await;
    h.state.visits.cancel_reservation(&reserve_id).await.unwrap();

    let result = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            status: Some(ReviewStatus::Ok),
            ..action(&reserve_id)
        })
        .await;
    assert_matches!(result, Err(VisitError::NoMatchingVisit(_)));
}

#[tokio::test]
async fn test_mismatched_patient_is_not_reviewable() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P205").await;

    let result = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            patient_id: Some("P999".to_string()),
            status: Some(ReviewStatus::Ok),
            ..action(&reserve_id)
        })
        .await;
    assert_matches!(result, Err(VisitError::NoMatchingVisit(_)));
}

#[tokio::test]
async fn test_empty_action_is_a_validation_error() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P206").await;

    let result = h.state.visits.record_doctor_action(action(&reserve_id)).await;
    assert_matches!(result, Err(VisitError::Validation(_)));

    let result = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest::default())
        .await;
    assert_matches!(result, Err(VisitError::Validation(_)));
}

#[tokio::test]
async fn test_legacy_outage_keeps_the_review_and_queues_the_copy() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P207").await;
    h.legacy.set_failing(true);

    let outcome = h
        .state
        .visits
        .record_doctor_action(DoctorActionRequest {
            status: Some(ReviewStatus::Ok),
            ..action(&reserve_id)
        })
        .await
        .unwrap();

    assert_matches!(outcome.sync, SyncOutcome::Queued { .. });
    assert_eq!(outcome.intake.status, ReviewStatus::Ok);
    assert_eq!(h.sync.pending().await.len(), 1);
}

async fn last_legacy_status(h: &common::Harness) -> Option<ReviewStatus> {
    h.legacy.calls().await.into_iter().rev().find_map(|op| match op {
        LegacyOperation::DoctorUpdate { status, .. } => Some(status),
        _ => None,
    })
}

#[tokio::test]
async fn test_later_review_supersedes_a_queued_copy() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P208").await;

    h.legacy.set_failing(true);
    h.state
        .visits
        .record_doctor_action(DoctorActionRequest {
            status: Some(ReviewStatus::Ng),
            ..action(&reserve_id)
        })
        .await
        .unwrap();
    assert_eq!(h.sync.pending().await.len(), 1);

    h.legacy.set_failing(false);
    h.state
        .visits
        .record_doctor_action(DoctorActionRequest {
            status: Some(ReviewStatus::Ok),
            ..action(&reserve_id)
        })
        .await
        .unwrap();

    assert!(h.sync.pending().await.is_empty());
    let report = h.sync.process_repair_queue().await;
    assert_eq!(report.attempted, 0);
    assert_eq!(last_legacy_status(&h).await, Some(ReviewStatus::Ok));
}

#[tokio::test]
async fn test_repair_sends_the_current_review() {
    let h = harness().await;
    let reserve_id = reviewable_visit(&h, "P209").await;

    h.legacy.set_failing(true);
    for status in [ReviewStatus::Ng, ReviewStatus::Ok] {
        h.state
            .visits
            .record_doctor_action(DoctorActionRequest {
                status: Some(status),
                ..action(&reserve_id)
            })
            .await
            .unwrap();
    }
    assert_eq!(h.sync.pending().await.len(), 1);

    h.legacy.set_failing(false);
    let report = h.sync.process_repair_queue().await;

    assert_eq!(report.repaired, 1);
    assert_eq!(h.legacy.calls_of("doctor_update").await, 1);
    assert_eq!(last_legacy_status(&h).await, Some(ReviewStatus::Ok));
}
