mod common;

use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use futures::future::join_all;
use tokio::sync::oneshot;

use lock_cell::LockError;
use shared_database::ClinicStore;
use shared_utils::test_utils::TestConfig;
use sync_cell::SyncOutcome;
use visit_cell::VisitError;

use common::{harness, harness_with, intake_request, reserve_request};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_submissions_store_one_intake() {
    let h = harness().await;

    let attempts = (0..6).map(|_| {
        let visits = h.state.visits.clone();
        async move { visits.submit_intake(intake_request("P100")).await }
    });
    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(h.store.intake_count("P100").await, 1);
    assert_eq!(outcomes.iter().filter(|o| !o.dedup).count(), 1);
    let intake_id = outcomes[0].intake_id;
    assert!(outcomes.iter().all(|o| o.intake_id == intake_id));
    assert_eq!(h.legacy.calls_of("intake").await, 1);
}

#[tokio::test]
async fn test_intake_after_reservation_links_the_booking() {
    let h = harness().await;

    let booked = h.state.visits.reserve(reserve_request("P101", 2, 10, 30)).await.unwrap();
    assert_eq!(booked.linked_intake_id, None);

    let outcome = h.state.visits.submit_intake(intake_request("P101")).await.unwrap();
    assert_eq!(outcome.reserve_id.as_deref(), Some(booked.reservation.reserve_id.as_str()));

    let stored = h.store.find_intake_by_patient("P101").await.unwrap().unwrap();
    assert_eq!(stored.reserve_id, Some(booked.reservation.reserve_id));
}

#[tokio::test]
async fn test_reservation_after_intake_links_the_questionnaire() {
    let h = harness().await;

    let outcome = h.state.visits.submit_intake(intake_request("P102")).await.unwrap();
    assert_eq!(outcome.reserve_id, None);

    let booked = h.state.visits.reserve(reserve_request("P102", 2, 11, 0)).await.unwrap();
    assert_eq!(booked.linked_intake_id, Some(outcome.intake_id));

    let stored = h
        .store
        .find_intake_by_reserve_id(&booked.reservation.reserve_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.intake_id, outcome.intake_id);
}

#[tokio::test]
async fn test_rebooking_after_cancel_relinks_the_intake() {
    let h = harness().await;
    h.state.visits.submit_intake(intake_request("P103")).await.unwrap();

    let first = h.state.visits.reserve(reserve_request("P103", 2, 10, 0)).await.unwrap();
    h.state
        .visits
        .cancel_reservation(&first.reservation.reserve_id)
        .await
        .unwrap();
    let second = h.state.visits.reserve(reserve_request("P103", 3, 10, 0)).await.unwrap();

    assert!(second.linked_intake_id.is_some());
    let stored = h.store.find_intake_by_patient("P103").await.unwrap().unwrap();
    assert_eq!(stored.reserve_id, Some(second.reservation.reserve_id));
}

#[tokio::test]
async fn test_legacy_outage_queues_the_intake_copy() {
    let h = harness().await;
    h.legacy.set_failing(true);

    let outcome = h.state.visits.submit_intake(intake_request("P104")).await.unwrap();

    assert_matches!(outcome.sync, SyncOutcome::Queued { .. });
    assert_eq!(h.store.intake_count("P104").await, 1);
    assert_eq!(h.sync.pending().await.len(), 1);

    h.legacy.set_failing(false);
    let report = h.sync.process_repair_queue().await;
    assert_eq!(report.repaired, 1);
    assert_eq!(h.legacy.calls_of("intake").await, 1);
}

#[tokio::test]
async fn test_mirror_outage_fails_before_the_legacy_store_is_touched() {
    let h = harness().await;
    h.store.set_write_failure(true);

    let result = h.state.visits.submit_intake(intake_request("P105")).await;

    assert_matches!(result, Err(VisitError::Store(_)));
    assert_eq!(h.store.intake_count("P105").await, 0);
    assert!(h.legacy.calls().await.is_empty());
}

#[tokio::test]
async fn test_invalid_patient_id_is_rejected() {
    let h = harness().await;
    let result = h.state.visits.submit_intake(intake_request("   ")).await;
    assert_matches!(result, Err(VisitError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_patient_lock_times_out_without_writing() {
    let h = harness_with(TestConfig {
        intake_lock_timeout_secs: 1,
        ..TestConfig::default()
    })
    .await;

    let (held_tx, held_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let locks = h.locks.clone();
    let holder = tokio::spawn(async move {
        locks
            .with_patient_lock("P106", StdDuration::from_secs(1), || async move {
                let _ = held_tx.send(());
                let _ = release_rx.await;
                Ok::<_, LockError>(())
            })
            .await
    });
    held_rx.await.unwrap();

    let result = h.state.visits.submit_intake(intake_request("P106")).await;
    assert_matches!(result, Err(VisitError::Lock(LockError::Timeout { .. })));
    assert_eq!(h.store.intake_count("P106").await, 0);

    release_tx.send(()).unwrap();
    holder.await.unwrap().unwrap();
}
