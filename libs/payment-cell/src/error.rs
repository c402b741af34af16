use thiserror::Error;

use cache_cell::CacheError;
use shared_database::StoreError;
use shared_models::error::AppError;
use shared_utils::signature::SignatureError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WebhookError {
    #[error("Webhook signature rejected: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("Order {0} kept changing while the event was applied")]
    Contended(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidSignature(err) => AppError::InvalidSignature(err.to_string()),
            WebhookError::Contended(order_id) => {
                AppError::Internal(format!("order {} update did not converge", order_id))
            }
            WebhookError::Store(err) => AppError::Database(err.to_string()),
            WebhookError::Cache(err) => err.into(),
        }
    }
}
