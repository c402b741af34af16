use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::clinic::{
    IntakeRecord, Order, Patient, ReorderRequest, ReorderStatus, Reservation, ReservationStatus,
    ReviewUpdate, SlotKey,
};
use shared_models::schedule::{DateOverride, WeeklyRule};

use crate::store::{ClinicStore, StoreError};

#[derive(Default)]
struct Tables {
    patients: HashMap<String, Patient>,
    intakes: Vec<IntakeRecord>,
    weekly_rules: Vec<WeeklyRule>,
    date_overrides: Vec<DateOverride>,
    reservations: Vec<Reservation>,
    reorders: Vec<ReorderRequest>,
    orders: HashMap<String, Order>,
}

/// In-process mirror used for local development and tests.
///
/// Every method takes the table lock once, so each call is atomic with
/// respect to the others just like a single-statement write in Postgres.
#[derive(Default)]
pub struct MemoryClinicStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryClinicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, simulating a mirror outage.
    pub fn set_write_failure(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub async fn seed_weekly_rule(&self, rule: WeeklyRule) {
        self.tables.write().await.weekly_rules.push(rule);
    }

    pub async fn seed_date_override(&self, date_override: DateOverride) {
        let mut tables = self.tables.write().await;
        tables
            .date_overrides
            .retain(|o| !(o.doctor_id == date_override.doctor_id && o.date == date_override.date));
        tables.date_overrides.push(date_override);
    }

    pub async fn intake_count(&self, patient_id: &str) -> usize {
        let tables = self.tables.read().await;
        tables.intakes.iter().filter(|i| i.patient_id == patient_id).count()
    }

    pub async fn reservation_count(&self) -> usize {
        self.tables.read().await.reservations.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Request("mirror unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClinicStore for MemoryClinicStore {
    async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, StoreError> {
        Ok(self.tables.read().await.patients.get(patient_id).cloned())
    }

    async fn upsert_patient(&self, patient: &Patient) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.patients.insert(patient.patient_id.clone(), patient.clone());
        Ok(())
    }

    async fn find_intake_by_patient(&self, patient_id: &str) -> Result<Option<IntakeRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.intakes.iter().find(|i| i.patient_id == patient_id).cloned())
    }

    async fn find_intake_by_reserve_id(&self, reserve_id: &str) -> Result<Option<IntakeRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .intakes
            .iter()
            .find(|i| i.reserve_id.as_deref() == Some(reserve_id))
            .cloned())
    }

    async fn insert_intake(&self, intake: &IntakeRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.intakes.iter().any(|i| i.intake_id == intake.intake_id) {
            return Err(StoreError::Duplicate(intake.intake_id.to_string()));
        }
        tables.intakes.push(intake.clone());
        debug!("Stored intake {} for patient {}", intake.intake_id, intake.patient_id);
        Ok(())
    }

    async fn link_intake_reservation(&self, intake_id: Uuid, reserve_id: Option<&str>) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let intake = tables
            .intakes
            .iter_mut()
            .find(|i| i.intake_id == intake_id)
            .ok_or_else(|| StoreError::NotFound(format!("intake {}", intake_id)))?;
        intake.reserve_id = reserve_id.map(str::to_string);
        intake.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_review(&self, intake_id: Uuid, update: &ReviewUpdate) -> Result<IntakeRecord, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let intake = tables
            .intakes
            .iter_mut()
            .find(|i| i.intake_id == intake_id)
            .ok_or_else(|| StoreError::NotFound(format!("intake {}", intake_id)))?;

        intake.status = update.status;
        intake.call_status = update.call_status;
        intake.call_status_updated_at = update.call_status_updated_at;
        intake.doctor_note = update.doctor_note.clone();
        intake.prescription_menu = update.prescription_menu.clone();
        intake.reviewed_at = update.reviewed_at;
        intake.updated_at = update.updated_at;

        Ok(intake.clone())
    }

    async fn weekly_rules(&self, doctor_id: &str) -> Result<Vec<WeeklyRule>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .weekly_rules
            .iter()
            .filter(|r| r.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    async fn date_overrides(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DateOverride>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .date_overrides
            .iter()
            .filter(|o| o.doctor_id == doctor_id && o.date >= from && o.date <= to)
            .cloned()
            .collect())
    }

    async fn get_reservation(&self, reserve_id: &str) -> Result<Option<Reservation>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.reservations.iter().find(|r| r.reserve_id == reserve_id).cloned())
    }

    async fn reservations_for_patient(&self, patient_id: &str) -> Result<Vec<Reservation>, StoreError> {
        let tables = self.tables.read().await;
        let mut found: Vec<Reservation> = tables
            .reservations
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn count_active_reservations(&self, slot: &SlotKey) -> Result<u32, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reservations
            .iter()
            .filter(|r| r.is_active() && &r.slot_key() == slot)
            .count() as u32)
    }

    async fn active_reservations_between(
        &self,
        doctor_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reservations
            .iter()
            .filter(|r| r.is_active() && r.doctor_id == doctor_id && r.date >= from && r.date <= to)
            .cloned()
            .collect())
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.reservations.iter().any(|r| r.reserve_id == reservation.reserve_id) {
            return Err(StoreError::Duplicate(reservation.reserve_id.clone()));
        }
        tables.reservations.push(reservation.clone());
        Ok(())
    }

    async fn cancel_reservation(
        &self,
        reserve_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Reservation>, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(reservation) = tables.reservations.iter_mut().find(|r| r.reserve_id == reserve_id) else {
            return Ok(None);
        };
        if reservation.status == ReservationStatus::Pending {
            reservation.status = ReservationStatus::Canceled;
            reservation.canceled_at = Some(at);
        }
        Ok(Some(reservation.clone()))
    }

    async fn get_reorder(&self, reorder_id: &str) -> Result<Option<ReorderRequest>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.reorders.iter().find(|r| r.reorder_id == reorder_id).cloned())
    }

    async fn reorders_for_patient(&self, patient_id: &str) -> Result<Vec<ReorderRequest>, StoreError> {
        let tables = self.tables.read().await;
        let mut found: Vec<ReorderRequest> = tables
            .reorders
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn insert_reorder(&self, reorder: &ReorderRequest) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.reorders.iter().any(|r| r.reorder_id == reorder.reorder_id) {
            return Err(StoreError::Duplicate(reorder.reorder_id.clone()));
        }
        tables.reorders.push(reorder.clone());
        Ok(())
    }

    async fn transition_reorder(
        &self,
        reorder_id: &str,
        from: ReorderStatus,
        to: ReorderStatus,
        doctor_note: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<ReorderRequest>, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(reorder) = tables
            .reorders
            .iter_mut()
            .find(|r| r.reorder_id == reorder_id && r.status == from)
        else {
            return Ok(None);
        };
        reorder.status = to;
        if let Some(note) = doctor_note {
            reorder.doctor_note = Some(note.to_string());
        }
        reorder.updated_at = at;
        Ok(Some(reorder.clone()))
    }

    async fn get_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.read().await.orders.get(order_id).cloned())
    }

    async fn orders_for_patient(&self, patient_id: &str) -> Result<Vec<Order>, StoreError> {
        let tables = self.tables.read().await;
        let mut found: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.patient_id.as_deref() == Some(patient_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn insert_order_if_absent(&self, order: &Order) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.order_id) {
            return Ok(false);
        }
        tables.orders.insert(order.order_id.clone(), order.clone());
        Ok(true)
    }

    async fn update_order_if_revision(&self, order: &Order, expected_revision: i64) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(&order.order_id) {
            Some(stored) if stored.revision == expected_revision => {
                *stored = order.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("order {}", order.order_id))),
        }
    }
}
