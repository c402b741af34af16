use axum::{routing::get, Router};

use cache_cell::create_cache_router;
use monitoring_cell::create_monitoring_router;
use payment_cell::create_payment_router;
use scheduling_cell::create_scheduling_router;
use sync_cell::create_sync_router;
use visit_cell::create_visit_router;

use crate::state::AppServices;

pub fn create_router(services: AppServices) -> Router {
    let ops = Router::new()
        .merge(create_cache_router(services.cache.clone()))
        .merge(create_sync_router(services.sync.clone()))
        .merge(create_monitoring_router(services.alerts.clone()));

    Router::new()
        .route("/", get(|| async { "Clinic consistency API is running!" }))
        .merge(create_visit_router(services.visit))
        .merge(create_scheduling_router(services.scheduler))
        .merge(create_payment_router(services.webhooks))
        .nest("/ops", ops)
}
