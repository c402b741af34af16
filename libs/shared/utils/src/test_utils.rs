use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use shared_config::{AppConfig, ReservationPolicy};
use shared_database::{LegacyOperation, LegacyStore, LegacyStoreError, MemoryClinicStore};
use shared_models::schedule::WeeklyRule;

pub const TEST_DOCTOR_ID: &str = "dr_tanaka";
pub const TEST_SIGNATURE_KEY: &str = "test-webhook-signature-key";

pub struct TestConfig {
    pub reservation_policy: ReservationPolicy,
    pub signature_keys: Vec<String>,
    pub intake_lock_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            reservation_policy: ReservationPolicy::Reject,
            signature_keys: vec![TEST_SIGNATURE_KEY.to_string()],
            intake_lock_timeout_secs: 2,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            webhook_signature_keys: self.signature_keys.clone(),
            reservation_policy: self.reservation_policy,
            intake_lock_timeout_secs: self.intake_lock_timeout_secs,
            slot_lock_timeout_secs: 2,
            lock_lease_secs: 10,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Legacy store double that records every operation and can be told to fail.
#[derive(Default)]
pub struct RecordingLegacyStore {
    calls: Mutex<Vec<LegacyOperation>>,
    failing: AtomicBool,
}

impl RecordingLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<LegacyOperation> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_of(&self, kind: &str) -> usize {
        self.calls.lock().await.iter().filter(|op| op.kind() == kind).count()
    }
}

#[async_trait]
impl LegacyStore for RecordingLegacyStore {
    async fn call(&self, operation: &LegacyOperation) -> Result<Value, LegacyStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LegacyStoreError::Transport("legacy store offline".to_string()));
        }
        self.calls.lock().await.push(operation.clone());
        Ok(json!({ "row": 1 }))
    }
}

/// Every weekday open 10:00-12:00 in 30 minute slots, capacity from config.
pub fn weekly_rules_for(doctor_id: &str) -> Vec<WeeklyRule> {
    (0..7)
        .map(|day_of_week| WeeklyRule {
            doctor_id: doctor_id.to_string(),
            day_of_week,
            enabled: true,
            start_time: time(10, 0),
            end_time: time(12, 0),
            slot_minutes: 30,
            capacity: None,
        })
        .collect()
}

pub async fn seeded_store(doctor_id: &str) -> Arc<MemoryClinicStore> {
    let store = Arc::new(MemoryClinicStore::new());
    for rule in weekly_rules_for(doctor_id) {
        store.seed_weekly_rule(rule).await;
    }
    store
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
