// libs/physician-cell/tests/router_test.rs

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use physician_cell::router::physician_routes;
use shared_utils::test_utils::{MockStoreDocuments, TestConfig};

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_lists_physicians_for_plan() {
    let (state, store, _) = TestConfig::default().to_state("2025-03-10T10:30");
    store
        .insert_with_id("medicos", "m1", MockStoreDocuments::physician("Dra. Ana Costa", "12345-SP", &[("cat-cardio", &[])]))
        .await;
    store
        .insert_with_id("medico_convenios", "a1", MockStoreDocuments::plan_agreement("m1", "plan-1", "Unimed", 3))
        .await;

    let (status, body) = get(physician_routes(state), "/?category=cat-cardio&plan=plan-1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["physicians"][0]["plan_name"], "Unimed");
    assert_eq!(body["physicians"][0]["monthly_limit"], 3);
}

#[tokio::test]
async fn test_missing_plan_is_bad_request() {
    let (state, _, _) = TestConfig::default().to_state("2025-03-10T10:30");

    let (status, _) = get(physician_routes(state.clone()), "/?category=cat-cardio").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(physician_routes(state), "/?category=cat-cardio&plan=plan-1&year=2025&month=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}
