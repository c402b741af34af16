use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::get_available_slots;
use crate::services::SlotScheduler;

pub fn create_scheduling_router(scheduler: Arc<SlotScheduler>) -> Router {
    Router::new()
        .route("/slots", get(get_available_slots))
        .with_state(scheduler)
}
