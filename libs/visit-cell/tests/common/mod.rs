#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

use cache_cell::{CacheConsistencyService, MemoryEdgeCache};
use lock_cell::LockManager;
use monitoring_cell::AlertManagerService;
use scheduling_cell::SlotScheduler;
use shared_database::{ClinicStore, MemoryClinicStore};
use shared_models::clinic::{Order, PaymentStatus, ShippingStatus};
use shared_utils::test_utils::{seeded_store, time, RecordingLegacyStore, TestConfig, TEST_DOCTOR_ID};
use sync_cell::CrossStoreSync;
use visit_cell::models::{IntakeRequest, ReserveRequest};
use visit_cell::{
    DashboardService, ReorderService, ShippingService, VisitCellState, VisitLifecycleService, VisitService,
};

pub struct Harness {
    pub store: Arc<MemoryClinicStore>,
    pub legacy: Arc<RecordingLegacyStore>,
    pub edge: Arc<MemoryEdgeCache>,
    pub alerts: Arc<AlertManagerService>,
    pub locks: LockManager,
    pub sync: Arc<CrossStoreSync>,
    pub cache: Arc<CacheConsistencyService>,
    pub state: VisitCellState,
}

pub async fn harness() -> Harness {
    harness_with(TestConfig::default()).await
}

pub async fn harness_with(test_config: TestConfig) -> Harness {
    let config = test_config.to_arc();
    let store = seeded_store(TEST_DOCTOR_ID).await;
    let legacy = Arc::new(RecordingLegacyStore::new());
    let edge = Arc::new(MemoryEdgeCache::new());
    let alerts = Arc::new(AlertManagerService::new());
    let locks = LockManager::local(StdDuration::from_secs(10));

    let sync = Arc::new(CrossStoreSync::new(store.clone(), legacy.clone(), alerts.clone()));
    let cache = Arc::new(CacheConsistencyService::new(
        edge.clone(),
        config.edge_cache_ttl(),
        config.local_cache_ttl(),
        alerts.clone(),
    ));
    let scheduler = Arc::new(SlotScheduler::new(store.clone(), locks.clone(), config.clone()));

    let state = VisitCellState {
        visits: Arc::new(VisitService::new(
            store.clone(),
            scheduler,
            locks.clone(),
            sync.clone(),
            cache.clone(),
            config.clone(),
        )),
        reorders: Arc::new(ReorderService::new(store.clone(), locks.clone(), cache.clone(), config.clone())),
        shipping: Arc::new(ShippingService::new(store.clone(), cache.clone())),
        dashboards: Arc::new(DashboardService::new(
            store.clone(),
            cache.clone(),
            VisitLifecycleService::new(config.clinic_offset()),
        )),
    };

    Harness {
        store,
        legacy,
        edge,
        alerts,
        locks,
        sync,
        cache,
        state,
    }
}

pub fn future_date(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

pub fn intake_request(patient_id: &str) -> IntakeRequest {
    let mut answers = BTreeMap::new();
    answers.insert("allergies".to_string(), json!("none"));
    answers.insert("height_cm".to_string(), json!(162));
    IntakeRequest {
        patient_id: patient_id.to_string(),
        display_name: Some("Hanako Yamada".to_string()),
        phone: Some("090-1234-5678".to_string()),
        contact_id: None,
        answers,
    }
}

pub fn reserve_request(patient_id: &str, days: i64, hour: u32, minute: u32) -> ReserveRequest {
    ReserveRequest {
        patient_id: patient_id.to_string(),
        doctor_id: TEST_DOCTOR_ID.to_string(),
        date: future_date(days),
        time: time(hour, minute),
    }
}

/// Intake plus an active reservation: a visit the doctor can review.
pub async fn reviewable_visit(h: &Harness, patient_id: &str) -> String {
    h.state.visits.submit_intake(intake_request(patient_id)).await.unwrap();
    let booked = h
        .state
        .visits
        .reserve(reserve_request(patient_id, 2, 10, 0))
        .await
        .unwrap();
    booked.reservation.reserve_id
}

pub async fn seed_paid_order(h: &Harness, order_id: &str, patient_id: &str, reorder_id: Option<&str>) -> Order {
    let now = Utc::now();
    let order = Order {
        order_id: order_id.to_string(),
        patient_id: Some(patient_id.to_string()),
        amount: 5000,
        payment_status: PaymentStatus::Paid,
        refunded_amount: 0,
        applied_refund_ids: vec![],
        reorder_id: reorder_id.map(str::to_string),
        product_code: Some("MJ_5".to_string()),
        shipping_status: ShippingStatus::Pending,
        tracking_number: None,
        carrier: None,
        paid_at: Some(now),
        refunded_at: None,
        canceled_at: None,
        revision: 1,
        created_at: now,
        updated_at: now,
    };
    h.store.insert_order_if_absent(&order).await.unwrap();
    order
}
