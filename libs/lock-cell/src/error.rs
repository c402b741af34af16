use std::time::Duration;

use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockError {
    #[error("Timed out after {waited:?} waiting for lock {key}")]
    Timeout { key: String, waited: Duration },

    #[error("Invalid lock scope: {0}")]
    InvalidScope(String),

    #[error("Lock backend error: {0}")]
    Backend(String),
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { .. } => AppError::LockTimeout(err.to_string()),
            LockError::InvalidScope(msg) => AppError::ValidationError(msg),
            LockError::Backend(msg) => AppError::ExternalService(msg),
        }
    }
}

impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::Backend(err.to_string())
    }
}
