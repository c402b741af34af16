use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{list_inconsistencies, repair_inconsistencies};
use crate::services::CrossStoreSync;

pub fn create_sync_router(sync: Arc<CrossStoreSync>) -> Router {
    Router::new()
        .route("/inconsistencies", get(list_inconsistencies))
        .route("/inconsistencies/repair", post(repair_inconsistencies))
        .with_state(sync)
}
