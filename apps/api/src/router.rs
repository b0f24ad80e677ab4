use axum::{routing::get, Router};

use availability_cell::router::availability_routes;
use booking_cell::router::booking_routes;
use physician_cell::router::physician_routes;
use shared_utils::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/physicians", physician_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use shared_utils::test_utils::{MockStoreDocuments, TestConfig};

    #[tokio::test]
    async fn test_cells_are_mounted() {
        let (state, store, _) = TestConfig::default().to_state("2025-03-10T10:30");
        store
            .insert_with_id(
                "availability",
                "rot-1",
                MockStoreDocuments::rotating_availability("m1", &[("2025-04-01", vec![MockStoreDocuments::slot("09:00", 1)])]),
            )
            .await;
        let app = create_router(state);

        let root = app.clone().oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(root.status(), StatusCode::OK);

        let slots = app
            .clone()
            .oneshot(Request::builder().uri("/availability/m1/slots?date=2025-04-01").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(slots.status(), StatusCode::OK);

        let physicians = app
            .oneshot(Request::builder().uri("/physicians?category=cat-cardio&plan=plan-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(physicians.status(), StatusCode::OK);
    }
}
