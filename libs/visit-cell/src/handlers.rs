use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::validation::validate_identifier;

use crate::models::{
    ConfirmReorderRequest, ContactUpdateRequest, CreateReorderRequest, DoctorActionRequest, IntakeRequest,
    ReserveRequest, ShipmentRequest,
};
use crate::router::VisitCellState;

// ==============================================================================
// INTAKE & RESERVATION
// ==============================================================================

pub async fn submit_intake(
    State(state): State<VisitCellState>,
    Json(request): Json<IntakeRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.visits.submit_intake(request).await?;
    Ok(Json(json!({
        "ok": true,
        "intake_id": outcome.intake_id,
        "dedup": outcome.dedup,
        "reserve_id": outcome.reserve_id,
        "sync": outcome.sync
    })))
}

pub async fn create_reservation(
    State(state): State<VisitCellState>,
    Json(request): Json<ReserveRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.visits.reserve(request).await?;
    Ok(Json(json!({
        "ok": true,
        "reservation": outcome.reservation,
        "replaced": outcome.replaced,
        "linked_intake_id": outcome.linked_intake_id
    })))
}

pub async fn cancel_reservation(
    State(state): State<VisitCellState>,
    Path(reserve_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let reservation = state.visits.cancel_reservation(&reserve_id).await?;
    Ok(Json(json!({ "ok": true, "reservation": reservation })))
}

// ==============================================================================
// DOCTOR
// ==============================================================================

pub async fn record_doctor_action(
    State(state): State<VisitCellState>,
    Json(action): Json<DoctorActionRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.visits.record_doctor_action(action).await?;
    Ok(Json(json!({
        "ok": true,
        "intake": outcome.intake,
        "sync": outcome.sync
    })))
}

// ==============================================================================
// REORDER
// ==============================================================================

pub async fn create_reorder(
    State(state): State<VisitCellState>,
    Json(request): Json<CreateReorderRequest>,
) -> Result<Json<Value>, AppError> {
    let reorder = state
        .reorders
        .create(&request.patient_id, &request.product_code)
        .await?;
    Ok(Json(json!({ "ok": true, "reorder": reorder })))
}

pub async fn confirm_reorder(
    State(state): State<VisitCellState>,
    Path(reorder_id): Path<String>,
    body: Option<Json<ConfirmReorderRequest>>,
) -> Result<Json<Value>, AppError> {
    let note = body.and_then(|Json(request)| request.doctor_note);
    let reorder = state.reorders.confirm(&reorder_id, note).await?;
    Ok(Json(json!({ "ok": true, "reorder": reorder })))
}

pub async fn cancel_reorder(
    State(state): State<VisitCellState>,
    Path(reorder_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let reorder = state.reorders.cancel(&reorder_id).await?;
    Ok(Json(json!({ "ok": true, "reorder": reorder })))
}

// ==============================================================================
// SHIPPING
// ==============================================================================

pub async fn mark_shipped(
    State(state): State<VisitCellState>,
    Path(order_id): Path<String>,
    Json(request): Json<ShipmentRequest>,
) -> Result<Json<Value>, AppError> {
    let order = state
        .shipping
        .mark_shipped(&order_id, &request.tracking_number, &request.carrier)
        .await?;
    Ok(Json(json!({ "ok": true, "order": order })))
}

pub async fn mark_delivered(
    State(state): State<VisitCellState>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let order = state.shipping.mark_delivered(&order_id).await?;
    Ok(Json(json!({ "ok": true, "order": order })))
}

// ==============================================================================
// PATIENT
// ==============================================================================

pub async fn update_contact_id(
    State(state): State<VisitCellState>,
    Path(patient_id): Path<String>,
    Json(request): Json<ContactUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let sync = state
        .visits
        .update_contact_id(&patient_id, &request.contact_id)
        .await?;
    Ok(Json(json!({ "ok": true, "sync": sync })))
}

pub async fn get_dashboard(
    State(state): State<VisitCellState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    validate_identifier("patient_id", &patient_id).map_err(AppError::ValidationError)?;
    let dashboard = state.dashboards.get_dashboard(&patient_id).await?;
    Ok(Json(json!({ "ok": true, "dashboard": dashboard })))
}

pub async fn get_reorders(
    State(state): State<VisitCellState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    validate_identifier("patient_id", &patient_id).map_err(AppError::ValidationError)?;
    let view = state.dashboards.get_reorders(&patient_id).await?;
    Ok(Json(json!({
        "ok": true,
        "patient_id": view.patient_id,
        "reorders": view.reorders
    })))
}
