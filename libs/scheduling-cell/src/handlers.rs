use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::validation::validate_identifier;

use crate::models::SlotQuery;
use crate::services::SlotScheduler;

/// Default window when `to` is omitted.
const DEFAULT_RANGE_DAYS: i64 = 14;

pub async fn get_available_slots(
    State(scheduler): State<Arc<SlotScheduler>>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    validate_identifier("doctor_id", &query.doctor_id).map_err(AppError::ValidationError)?;
    let to = query
        .to
        .unwrap_or(query.from + chrono::Duration::days(DEFAULT_RANGE_DAYS - 1));

    let slots = scheduler
        .get_available_slots(&query.doctor_id, query.from, to)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "doctor_id": query.doctor_id,
        "slots": slots
    })))
}
