use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::services::CrossStoreSync;

pub async fn list_inconsistencies(State(sync): State<Arc<CrossStoreSync>>) -> Json<Value> {
    let pending = sync.pending().await;
    Json(json!({
        "ok": true,
        "count": pending.len(),
        "inconsistencies": pending
    }))
}

pub async fn repair_inconsistencies(State(sync): State<Arc<CrossStoreSync>>) -> Json<Value> {
    let report = sync.process_repair_queue().await;
    Json(json!({
        "ok": true,
        "report": report
    }))
}
