use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers::invalidate_patient_cache;
use crate::services::CacheConsistencyService;

pub fn create_cache_router(cache: Arc<CacheConsistencyService>) -> Router {
    Router::new()
        .route("/cache/invalidate", post(invalidate_patient_cache))
        .with_state(cache)
}
