// libs/booking-cell/tests/router_test.rs
// POST /bookings against the in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use booking_cell::router::booking_routes;
use shared_utils::test_utils::{MockStoreDocuments, TestConfig};

fn draft(date: &str, time: &str) -> Value {
    json!({
        "patient": {
            "name": "Maria Silva",
            "email": "maria@example.com",
            "national_id": "123.456.789-09",
            "phone": "+55 11 98765-4321",
            "address": "Rua das Flores, 100"
        },
        "category_id": "cat-cardio",
        "insurance_plan_id": "plan-1",
        "physician_id": "m1",
        "date": date,
        "time": time
    })
}

async fn post(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_booking_created_then_conflicts() {
    let (state, store, _) = TestConfig::default().to_state("2025-03-10T10:30");
    store
        .insert_with_id(
            "availability",
            "rot-1",
            MockStoreDocuments::rotating_availability("m1", &[("2025-04-01", vec![MockStoreDocuments::slot("09:00", 1)])]),
        )
        .await;
    let app = booking_routes(state);

    let (status, body) = post(&app, draft("2025-04-01", "09:00")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["physician_id"], "m1");
    assert_eq!(body["time"], "09:00");
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

    let (status, body) = post(&app, draft("2025-04-01", "09:00")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
    assert_eq!(store.count("agendamentos").await, 1);
}

#[tokio::test]
async fn test_incomplete_draft_is_rejected() {
    let (state, store, _) = TestConfig::default().to_state("2025-03-10T10:30");
    let app = booking_routes(state);

    let mut body = draft("2025-04-01", "09:00");
    body.as_object_mut().unwrap().remove("physician_id");

    let (status, response) = post(&app, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "validation_failure");
    assert_eq!(store.count("agendamentos").await, 0);
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let (state, store, _) = TestConfig::default().to_state("2025-03-10T10:30");
    store.set_offline(true);
    let app = booking_routes(state);

    let (status, body) = post(&app, draft("2025-04-01", "09:00")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "store_unavailable");
}
