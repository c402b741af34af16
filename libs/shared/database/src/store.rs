use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::clinic::{
    IntakeRecord, Order, Patient, ReorderRequest, ReorderStatus, Reservation, ReviewUpdate, SlotKey,
};
use shared_models::schedule::{DateOverride, WeeklyRule};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Mirror request failed: {0}")]
    Request(String),

    #[error("Mirror returned malformed data: {0}")]
    Decode(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

/// The relational mirror: system of record for everything written after
/// initial creation, and the only source the read path loads from.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, StoreError>;
    async fn upsert_patient(&self, patient: &Patient) -> Result<(), StoreError>;

    async fn find_intake_by_patient(&self, patient_id: &str) -> Result<Option<IntakeRecord>, StoreError>;
    async fn find_intake_by_reserve_id(&self, reserve_id: &str) -> Result<Option<IntakeRecord>, StoreError>;
    async fn insert_intake(&self, intake: &IntakeRecord) -> Result<(), StoreError>;
    async fn link_intake_reservation(&self, intake_id: Uuid, reserve_id: Option<&str>) -> Result<(), StoreError>;
    /// Applies every field of the update in a single row write.
    async fn apply_review(&self, intake_id: Uuid, update: &ReviewUpdate) -> Result<IntakeRecord, StoreError>;

    async fn weekly_rules(&self, doctor_id: &str) -> Result<Vec<WeeklyRule>, StoreError>;
    async fn date_overrides(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DateOverride>, StoreError>;

    async fn get_reservation(&self, reserve_id: &str) -> Result<Option<Reservation>, StoreError>;
    async fn reservations_for_patient(&self, patient_id: &str) -> Result<Vec<Reservation>, StoreError>;
    async fn count_active_reservations(&self, slot: &SlotKey) -> Result<u32, StoreError>;
    async fn active_reservations_between(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError>;
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<(), StoreError>;
    /// Flips a pending reservation to canceled. Returns the stored row either way,
    /// or `None` when the reservation does not exist.
    async fn cancel_reservation(
        &self,
        reserve_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError>;

    async fn get_reorder(&self, reorder_id: &str) -> Result<Option<ReorderRequest>, StoreError>;
    async fn reorders_for_patient(&self, patient_id: &str) -> Result<Vec<ReorderRequest>, StoreError>;
    async fn insert_reorder(&self, reorder: &ReorderRequest) -> Result<(), StoreError>;
    /// Compare-and-set on status. `None` means the row was not in `from`.
    async fn transition_reorder(
        &self,
        reorder_id: &str,
        from: ReorderStatus,
        to: ReorderStatus,
        doctor_note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<ReorderRequest>, StoreError>;

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError>;
    async fn orders_for_patient(&self, patient_id: &str) -> Result<Vec<Order>, StoreError>;
    /// Returns `false` when an order with the same id already exists.
    async fn insert_order_if_absent(&self, order: &Order) -> Result<bool, StoreError>;
    /// Stores `order` only if the stored revision still equals `expected_revision`.
    async fn update_order_if_revision(&self, order: &Order, expected_revision: i64) -> Result<bool, StoreError>;
}
