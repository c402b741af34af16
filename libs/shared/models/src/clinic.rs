// libs/shared/models/src/clinic.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ==============================================================================
// PATIENT & INTAKE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub patient_id: String,
    pub display_name: String,
    pub contact_id: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Doctor review outcome. Serialized the way the clinic sheets record it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReviewStatus {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NG")]
    Ng,
}

impl ReviewStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, ReviewStatus::Unset)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Unset => write!(f, ""),
            ReviewStatus::Ok => write!(f, "OK"),
            ReviewStatus::Ng => write!(f, "NG"),
        }
    }
}

/// Contact side-flag attached to a visit under review.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CallStatus {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "no_answer")]
    NoAnswer,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStatus::Unset => write!(f, ""),
            CallStatus::NoAnswer => write!(f, "no_answer"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeRecord {
    pub intake_id: Uuid,
    pub patient_id: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub answers: BTreeMap<String, Value>,
    pub reserve_id: Option<String>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub call_status: CallStatus,
    pub call_status_updated_at: Option<DateTime<Utc>>,
    pub doctor_note: Option<String>,
    pub prescription_menu: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// A single logical review write. Stores apply every field in one row update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewUpdate {
    pub status: ReviewStatus,
    pub call_status: CallStatus,
    pub call_status_updated_at: Option<DateTime<Utc>>,
    pub doctor_note: Option<String>,
    pub prescription_menu: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// RESERVATION
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Canceled,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Admission-control key: one doctor, one date, one start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SlotKey {
    pub fn new(doctor_id: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            date,
            time,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.doctor_id,
            self.date.format("%Y-%m-%d"),
            self.time.format("%H:%M")
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub reserve_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.doctor_id.clone(), self.date, self.time)
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Pending
    }

    /// Appointment start as an instant, given the clinic's UTC offset.
    pub fn starts_at(&self, offset: FixedOffset) -> Option<DateTime<Utc>> {
        offset
            .from_local_datetime(&NaiveDateTime::new(self.date, self.time))
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}

// ==============================================================================
// REORDER
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReorderStatus {
    Pending,
    Confirmed,
    Paid,
    Canceled,
}

impl ReorderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReorderStatus::Paid | ReorderStatus::Canceled)
    }

    /// Forward-only, with cancellation allowed from any pre-paid state.
    pub fn can_transition_to(&self, target: &ReorderStatus) -> bool {
        use ReorderStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed) | (Confirmed, Paid) | (Pending, Canceled) | (Confirmed, Canceled)
        )
    }
}

impl fmt::Display for ReorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderStatus::Pending => write!(f, "pending"),
            ReorderStatus::Confirmed => write!(f, "confirmed"),
            ReorderStatus::Paid => write!(f, "paid"),
            ReorderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReorderRequest {
    pub reorder_id: String,
    pub patient_id: String,
    pub product_code: String,
    pub status: ReorderStatus,
    pub doctor_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// ORDER
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    RefundPending,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::RefundPending => write!(f, "refund_pending"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

impl fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShippingStatus::Pending => write!(f, "pending"),
            ShippingStatus::Shipped => write!(f, "shipped"),
            ShippingStatus::Delivered => write!(f, "delivered"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub patient_id: Option<String>,
    pub amount: i64,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub refunded_amount: i64,
    /// Gateway refund ids already folded into `refunded_amount`.
    #[serde(default)]
    pub applied_refund_ids: Vec<String>,
    pub reorder_id: Option<String>,
    pub product_code: Option<String>,
    #[serde(default)]
    pub shipping_status: ShippingStatus,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    /// Compare-and-set version, bumped on every stored update.
    #[serde(default)]
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_review_and_call_status_use_sheet_encoding() {
        assert_eq!(serde_json::to_value(ReviewStatus::Ok).unwrap(), json!("OK"));
        assert_eq!(serde_json::to_value(ReviewStatus::Unset).unwrap(), json!(""));
        assert_eq!(serde_json::to_value(CallStatus::NoAnswer).unwrap(), json!("no_answer"));
        let parsed: CallStatus = serde_json::from_value(json!("")).unwrap();
        assert_eq!(parsed, CallStatus::Unset);
    }

    #[test]
    fn test_reorder_transitions_are_forward_only() {
        assert!(ReorderStatus::Pending.can_transition_to(&ReorderStatus::Confirmed));
        assert!(ReorderStatus::Confirmed.can_transition_to(&ReorderStatus::Paid));
        assert!(!ReorderStatus::Pending.can_transition_to(&ReorderStatus::Paid));
        assert!(!ReorderStatus::Paid.can_transition_to(&ReorderStatus::Canceled));
        assert!(!ReorderStatus::Confirmed.can_transition_to(&ReorderStatus::Pending));
    }

    #[test]
    fn test_reservation_start_respects_clinic_offset() {
        let reservation = Reservation {
            reserve_id: "r1".into(),
            patient_id: "p1".into(),
            doctor_id: "d1".into(),
            date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
            canceled_at: None,
        };
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let start = reservation.starts_at(jst).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-05-01T01:00:00+00:00");
        assert_eq!(reservation.slot_key().to_string(), "d1:2026-05-01:10:00");
    }
}
