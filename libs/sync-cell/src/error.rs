use thiserror::Error;

use shared_database::{LegacyStoreError, StoreError};
use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Legacy master store write failed: {0}")]
    Legacy(#[from] LegacyStoreError),

    #[error("Relational mirror write failed: {0}")]
    Mirror(#[from] StoreError),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Legacy(_) => AppError::ExternalService(err.to_string()),
            SyncError::Mirror(_) => AppError::Database(err.to_string()),
            SyncError::PatientNotFound(id) => AppError::NotFound(format!("patient {}", id)),
        }
    }
}
