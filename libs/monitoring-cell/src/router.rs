// =====================================================================================
// MONITORING CELL ROUTER
// =====================================================================================

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{acknowledge_alert, get_active_alerts};
use crate::services::AlertManagerService;

pub fn create_monitoring_router(alerts: Arc<AlertManagerService>) -> Router {
    Router::new()
        .route("/alerts", get(get_active_alerts))
        .route("/alerts/acknowledge", post(acknowledge_alert))
        .with_state(alerts)
}
