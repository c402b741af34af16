use thiserror::Error;

use lock_cell::LockError;
use shared_database::StoreError;
use shared_models::clinic::SlotKey;
use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot {0} is not offered")]
    SlotNotOffered(SlotKey),

    #[error("Slot {0} is full")]
    SlotFull(SlotKey),

    #[error("Patient {patient_id} already holds reservation {reserve_id}")]
    AlreadyBooked { patient_id: String, reserve_id: String },

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::SlotNotOffered(_) => AppError::ValidationError(err.to_string()),
            SchedulingError::SlotFull(_) => AppError::SlotFull(err.to_string()),
            SchedulingError::AlreadyBooked { .. } => AppError::AlreadyBooked(err.to_string()),
            SchedulingError::ReservationNotFound(_) => AppError::NotFound(err.to_string()),
            SchedulingError::Lock(lock) => lock.into(),
            SchedulingError::Store(store) => AppError::Database(store.to_string()),
        }
    }
}
