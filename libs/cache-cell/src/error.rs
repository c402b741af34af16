use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Edge cache error: {0}")]
    Edge(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache invalidation failed for patient {patient_id}: {reason}")]
    InvalidationFailed { patient_id: String, reason: String },
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Edge(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidationFailed { .. } => AppError::CacheInvalidation(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}
