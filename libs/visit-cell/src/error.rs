use thiserror::Error;

use cache_cell::CacheError;
use lock_cell::LockError;
use scheduling_cell::SchedulingError;
use shared_database::StoreError;
use shared_models::error::AppError;
use sync_cell::SyncError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisitError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No matching visit: {0}")]
    NoMatchingVisit(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<VisitError> for AppError {
    fn from(err: VisitError) -> Self {
        match err {
            VisitError::Validation(msg) => AppError::ValidationError(msg),
            VisitError::NoMatchingVisit(msg) => AppError::NoMatchingVisit(msg),
            VisitError::InvalidTransition(msg) => AppError::InvalidTransition(msg),
            VisitError::NotFound(msg) => AppError::NotFound(msg),
            VisitError::Scheduling(err) => err.into(),
            VisitError::Lock(err) => err.into(),
            VisitError::Store(err) => AppError::Database(err.to_string()),
            VisitError::Sync(err) => err.into(),
            VisitError::Cache(err) => err.into(),
        }
    }
}
