use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers::payment_webhook;
use crate::services::WebhookReconciler;

pub fn create_payment_router(reconciler: Arc<WebhookReconciler>) -> Router {
    Router::new()
        .route("/webhooks/payments", post(payment_webhook))
        .with_state(reconciler)
}
