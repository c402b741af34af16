use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use shared_models::clinic::Reservation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailableSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub capacity: u32,
    pub booked: u32,
    pub remaining: u32,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub doctor_id: String,
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

/// A successful booking, plus the reservation it replaced (if any).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReservationOutcome {
    pub reservation: Reservation,
    pub replaced: Option<Reservation>,
}
