use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Slot full: {0}")]
    SlotFull(String),

    #[error("Already booked: {0}")]
    AlreadyBooked(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("No matching visit: {0}")]
    NoMatchingVisit(String),

    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Cache invalidation failed: {0}")]
    CacheInvalidation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code returned to callers.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::SlotFull(_) => "slot_full",
            AppError::AlreadyBooked(_) => "already_booked",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::NoMatchingVisit(_) => "no_matching_visit",
            AppError::LockTimeout(_) => "lock_timeout",
            AppError::InvalidSignature(_) => "invalid_signature",
            AppError::CacheInvalidation(_) => "cache_invalidation_failed",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
            AppError::ExternalService(_) => "external_service_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotFull(_)
            | AppError::AlreadyBooked(_)
            | AppError::InvalidTransition(_)
            | AppError::NoMatchingVisit(_) => StatusCode::CONFLICT,
            AppError::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            AppError::CacheInvalidation(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Contention errors the caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::LockTimeout(_) | AppError::SlotFull(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "Error: {}: {}", status, message);
        } else {
            tracing::warn!(code = self.code(), "Rejected: {}: {}", status, message);
        }

        let body = Json(json!({
            "ok": false,
            "code": self.code(),
            "retryable": self.is_retryable(),
            "error": message
        }));

        (status, body).into_response()
    }
}
