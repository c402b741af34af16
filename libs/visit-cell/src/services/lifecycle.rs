use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, warn};

use shared_models::clinic::{
    CallStatus, IntakeRecord, PaymentStatus, ReorderStatus, ReviewStatus, ReviewUpdate, ShippingStatus,
};

use crate::error::VisitError;
use crate::models::{DoctorActionRequest, PatientSnapshot, VisitStage};

/// Pure state-machine rules: stage derivation and review transitions.
#[derive(Debug, Clone, Copy)]
pub struct VisitLifecycleService {
    clinic_offset: FixedOffset,
}

impl VisitLifecycleService {
    pub fn new(clinic_offset: FixedOffset) -> Self {
        Self { clinic_offset }
    }

    /// Furthest stage the records prove. `None` when nothing exists yet.
    pub fn derive_stage(&self, snapshot: &PatientSnapshot, now: DateTime<Utc>) -> Option<VisitStage> {
        let paid_order = snapshot
            .orders
            .iter()
            .find(|order| order.payment_status == PaymentStatus::Paid);
        if let Some(order) = paid_order {
            return Some(match order.shipping_status {
                ShippingStatus::Delivered => VisitStage::Delivered,
                ShippingStatus::Shipped => VisitStage::Shipped,
                ShippingStatus::Pending => VisitStage::Paid,
            });
        }

        if let Some(reorder) = snapshot
            .reorders
            .iter()
            .find(|reorder| reorder.status != ReorderStatus::Canceled)
        {
            return Some(match reorder.status {
                ReorderStatus::Pending => VisitStage::ReorderRequested,
                ReorderStatus::Confirmed => VisitStage::ReorderConfirmed,
                _ => VisitStage::Paid,
            });
        }

        if let Some(intake) = &snapshot.intake {
            match intake.status {
                ReviewStatus::Ok => return Some(VisitStage::Approved),
                ReviewStatus::Ng => return Some(VisitStage::Rejected),
                ReviewStatus::Unset => {}
            }
        }

        if let Some(reservation) = snapshot.active_reservation() {
            let started = reservation
                .starts_at(self.clinic_offset)
                .is_some_and(|start| start <= now);
            return Some(if started {
                VisitStage::UnderReview
            } else {
                VisitStage::Reserved
            });
        }

        if snapshot.intake.is_some() {
            return Some(VisitStage::Submitted);
        }
        if !snapshot.reservations.is_empty() {
            return Some(VisitStage::Canceled);
        }
        None
    }

    /// Builds the single row write for a doctor action.
    ///
    /// Deciding OK/NG clears the no-answer flag and stamps a fresh
    /// `call_status_updated_at` in the same write.
    pub fn review_update(
        &self,
        current: &IntakeRecord,
        action: &DoctorActionRequest,
        now: DateTime<Utc>,
    ) -> Result<ReviewUpdate, VisitError> {
        let decision = action.status.filter(ReviewStatus::is_decided);
        let call_status = action.call_status;

        if decision.is_none() && call_status.is_none() && action.note.is_none() && action.menu.is_none() {
            return Err(VisitError::Validation(
                "doctor action needs status, call_status, note or menu".to_string(),
            ));
        }

        let mut update = ReviewUpdate {
            status: current.status,
            call_status: current.call_status,
            call_status_updated_at: current.call_status_updated_at,
            doctor_note: action.note.clone().or_else(|| current.doctor_note.clone()),
            prescription_menu: action.menu.clone().or_else(|| current.prescription_menu.clone()),
            reviewed_at: current.reviewed_at,
            updated_at: now,
        };

        match (decision, call_status) {
            (Some(status), _) => {
                if call_status == Some(CallStatus::NoAnswer) {
                    warn!("Ignoring no_answer sent together with {}", status);
                }
                update.status = status;
                update.call_status = CallStatus::Unset;
                update.call_status_updated_at = Some(now);
                update.reviewed_at = Some(now);
            }
            (None, Some(CallStatus::NoAnswer)) => {
                if current.status.is_decided() {
                    return Err(VisitError::InvalidTransition(format!(
                        "visit already reviewed as {}; no_answer no longer applies",
                        current.status
                    )));
                }
                update.call_status = CallStatus::NoAnswer;
                update.call_status_updated_at = Some(now);
            }
            (None, Some(CallStatus::Unset)) => {
                update.call_status = CallStatus::Unset;
                update.call_status_updated_at = Some(now);
            }
            (None, None) => {}
        }

        debug!("Review update for intake {}: {:?}", current.intake_id, update.status);
        Ok(update)
    }
}
