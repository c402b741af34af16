use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::validation::{non_empty, validate_identifier};

use crate::models::InvalidateRequest;
use crate::services::CacheConsistencyService;

/// Operator-triggered recovery: clears both tiers for one patient.
pub async fn invalidate_patient_cache(
    State(cache): State<Arc<CacheConsistencyService>>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = non_empty(request.patient_id)
        .ok_or_else(|| AppError::ValidationError("patient_id is required".to_string()))?;
    validate_identifier("patient_id", &patient_id).map_err(AppError::ValidationError)?;

    cache.invalidate(&patient_id).await?;

    Ok(Json(json!({
        "ok": true,
        "patient_id": patient_id
    })))
}
