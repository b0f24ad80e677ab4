use axum::{routing::get, Router};

use shared_utils::AppState;

use crate::handlers;

pub fn physician_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list_eligible_physicians))
        .with_state(state)
}
