use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::WebhookAck;
use crate::services::WebhookReconciler;

pub const SIGNATURE_HEADER: &str = "x-gateway-signature";
pub const EVENT_TYPE_HEADER: &str = "x-gateway-event-type";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Gateway callback. Anything but a bad signature or an internal failure is
/// acknowledged with 200 so the gateway stops redelivering.
pub async fn payment_webhook(
    State(reconciler): State<Arc<WebhookReconciler>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let ack = reconciler
        .handle(&body, header(&headers, SIGNATURE_HEADER), header(&headers, EVENT_TYPE_HEADER))
        .await?;

    Ok(Json(match ack {
        WebhookAck::Processed {
            order_id,
            payment_status,
            changed,
        } => json!({
            "ok": true,
            "order_id": order_id,
            "payment_status": payment_status,
            "changed": changed
        }),
        WebhookAck::Ignored { reason } => json!({
            "ok": true,
            "ignored": true,
            "reason": reason
        }),
    }))
}
