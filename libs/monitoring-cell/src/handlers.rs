// =====================================================================================
// MONITORING CELL HANDLERS
// =====================================================================================

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::AcknowledgeAlertRequest;
use crate::services::AlertManagerService;

pub async fn get_active_alerts(State(alerts): State<Arc<AlertManagerService>>) -> Json<Value> {
    let active = alerts.get_active_alerts().await;
    let summary = alerts.get_alert_summary().await;
    Json(json!({
        "ok": true,
        "alerts": active,
        "summary": summary
    }))
}

pub async fn acknowledge_alert(
    State(alerts): State<Arc<AlertManagerService>>,
    Json(request): Json<AcknowledgeAlertRequest>,
) -> Result<Json<Value>, AppError> {
    if !alerts.acknowledge_alert(&request.alert_id).await {
        return Err(AppError::NotFound(format!("alert {}", request.alert_id)));
    }
    Ok(Json(json!({ "ok": true })))
}
