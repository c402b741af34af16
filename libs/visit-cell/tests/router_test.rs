mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use visit_cell::create_visit_router;

use common::{future_date, harness};

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_visit_journey_over_http() {
    let h = harness().await;
    let app = create_visit_router(h.state.clone());

    let intake = json!({ "patient_id": "P500", "display_name": "Taro", "answers": { "allergies": "none" } });
    let (status, first) = send(&app, "POST", "/intake", Some(intake.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["dedup"], json!(false));

    let (_, second) = send(&app, "POST", "/intake", Some(intake)).await;
    assert_eq!(second["dedup"], json!(true));
    assert_eq!(second["intake_id"], first["intake_id"]);

    let reserve = json!({
        "patient_id": "P500",
        "doctor_id": "dr_tanaka",
        "date": future_date(2).to_string(),
        "time": "10:30:00"
    });
    let (status, booked) = send(&app, "POST", "/reservations", Some(reserve)).await;
    assert_eq!(status, StatusCode::OK);
    let reserve_id = booked["reservation"]["reserve_id"].as_str().unwrap().to_string();
    assert_eq!(booked["linked_intake_id"], first["intake_id"]);

    let action = json!({ "reserve_id": reserve_id, "status": "OK", "menu": "MJ_5" });
    let (status, reviewed) = send(&app, "POST", "/doctor/actions", Some(action)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["intake"]["status"], json!("OK"));

    let (status, dashboard) = send(&app, "GET", "/patients/P500/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["dashboard"]["stage"], json!("approved"));

    let (status, created) = send(
        &app,
        "POST",
        "/reorders",
        Some(json!({ "patient_id": "P500", "product_code": "MJ_5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reorder_id = created["reorder"]["reorder_id"].as_str().unwrap().to_string();

    let (status, confirmed) = send(&app, "POST", &format!("/reorders/{}/confirm", reorder_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["reorder"]["status"], json!("confirmed"));

    let (_, reorders) = send(&app, "GET", "/patients/P500/reorders", None).await;
    assert_eq!(reorders["reorders"][0]["status"], json!("confirmed"));
}

#[tokio::test]
async fn test_doctor_action_without_visit_is_a_conflict() {
    let h = harness().await;
    let app = create_visit_router(h.state.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/doctor/actions",
        Some(json!({ "reserve_id": "ghost", "status": "OK" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["code"], json!("no_matching_visit"));
}

#[tokio::test]
async fn test_invalid_dashboard_id_is_a_bad_request() {
    let h = harness().await;
    let app = create_visit_router(h.state.clone());

    let (status, body) = send(&app, "GET", "/patients/-bad/dashboard", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["retryable"], json!(false));
}

#[tokio::test]
async fn test_full_slot_over_http_is_retryable_conflict() {
    let h = harness().await;
    let app = create_visit_router(h.state.clone());
    let date = future_date(3).to_string();

    for patient in ["P501", "P502"] {
        let body = json!({ "patient_id": patient, "doctor_id": "dr_tanaka", "date": date, "time": "11:00:00" });
        let (status, _) = send(&app, "POST", "/reservations", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let body = json!({ "patient_id": "P503", "doctor_id": "dr_tanaka", "date": date, "time": "11:00:00" });
    let (status, rejected) = send(&app, "POST", "/reservations", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(rejected["code"], json!("slot_full"));
}
