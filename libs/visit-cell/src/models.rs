use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_models::clinic::{
    CallStatus, IntakeRecord, Order, Patient, ReorderRequest, Reservation, ReviewStatus,
};
use sync_cell::SyncOutcome;

// ==============================================================================
// VISIT STAGE
// ==============================================================================

/// Where a patient's journey stands, derived from the stored records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitStage {
    Submitted,
    Reserved,
    UnderReview,
    Approved,
    Rejected,
    ReorderRequested,
    ReorderConfirmed,
    Paid,
    Shipped,
    Delivered,
    Canceled,
}

impl VisitStage {
    pub fn is_paid_or_later(&self) -> bool {
        matches!(self, VisitStage::Paid | VisitStage::Shipped | VisitStage::Delivered)
    }
}

// ==============================================================================
// READ MODELS
// ==============================================================================

/// Everything the mirror knows about one patient's journey. This is the
/// cached value; the stage is derived from it at read time because
/// `UnderReview` depends on the clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSnapshot {
    pub patient_id: String,
    pub patient: Option<Patient>,
    pub intake: Option<IntakeRecord>,
    /// Newest first.
    pub reservations: Vec<Reservation>,
    /// Newest first.
    pub reorders: Vec<ReorderRequest>,
    /// Newest first.
    pub orders: Vec<Order>,
    pub loaded_at: DateTime<Utc>,
}

impl PatientSnapshot {
    pub fn is_empty(&self) -> bool {
        self.patient.is_none() && self.intake.is_none() && self.reservations.is_empty()
    }

    pub fn active_reservation(&self) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.is_active())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardView {
    pub stage: Option<VisitStage>,
    pub no_answer: bool,
    #[serde(flatten)]
    pub snapshot: PatientSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReordersView {
    pub patient_id: String,
    pub reorders: Vec<ReorderRequest>,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct IntakeRequest {
    pub patient_id: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub contact_id: Option<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorActionRequest {
    pub reserve_id: Option<String>,
    pub patient_id: Option<String>,
    pub status: Option<ReviewStatus>,
    pub call_status: Option<CallStatus>,
    pub note: Option<String>,
    pub menu: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReorderRequest {
    pub patient_id: String,
    pub product_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfirmReorderRequest {
    pub doctor_note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentRequest {
    pub tracking_number: String,
    pub carrier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactUpdateRequest {
    pub contact_id: String,
}

// ==============================================================================
// OUTCOMES
// ==============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IntakeOutcome {
    pub intake_id: Uuid,
    pub dedup: bool,
    pub reserve_id: Option<String>,
    pub sync: SyncOutcome,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReserveOutcome {
    pub reservation: Reservation,
    pub replaced: Option<Reservation>,
    pub linked_intake_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DoctorActionOutcome {
    pub intake: IntakeRecord,
    pub sync: SyncOutcome,
}
