use axum::{routing::post, Router};

use shared_utils::AppState;

use crate::handlers;

pub fn booking_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::create_booking))
        .with_state(state)
}
