use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    cancel_reorder, cancel_reservation, confirm_reorder, create_reorder, create_reservation, get_dashboard,
    get_reorders, mark_delivered, mark_shipped, record_doctor_action, submit_intake, update_contact_id,
};
use crate::services::{DashboardService, ReorderService, ShippingService, VisitService};

#[derive(Clone)]
pub struct VisitCellState {
    pub visits: Arc<VisitService>,
    pub reorders: Arc<ReorderService>,
    pub shipping: Arc<ShippingService>,
    pub dashboards: Arc<DashboardService>,
}

pub fn create_visit_router(state: VisitCellState) -> Router {
    Router::new()
        .route("/intake", post(submit_intake))
        .route("/reservations", post(create_reservation))
        .route("/reservations/{reserve_id}/cancel", post(cancel_reservation))
        .route("/doctor/actions", post(record_doctor_action))
        .route("/reorders", post(create_reorder))
        .route("/reorders/{reorder_id}/confirm", post(confirm_reorder))
        .route("/reorders/{reorder_id}/cancel", post(cancel_reorder))
        .route("/orders/{order_id}/shipment", post(mark_shipped))
        .route("/orders/{order_id}/delivered", post(mark_delivered))
        .route("/patients/{patient_id}/contact", post(update_contact_id))
        .route("/patients/{patient_id}/dashboard", get(get_dashboard))
        .route("/patients/{patient_id}/reorders", get(get_reorders))
        .with_state(state)
}
