use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn availability_routes(state: AppState) -> Router {
    // Public routes used by the booking wizard
    let public_routes = Router::new()
        .route("/{physician_id}/slots", get(handlers::get_available_slots))
        .route("/{physician_id}/calendar", get(handlers::get_month_calendar));

    // Staff routes (admin role required)
    let protected_routes = Router::new()
        .route("/{physician_id}", get(handlers::get_schedule))
        .route("/{physician_id}/fixed", post(handlers::save_fixed_schedule))
        .route("/{physician_id}/rotating", post(handlers::save_rotating_schedule))
        .route("/records/{record_id}", delete(handlers::delete_record))
        .route("/records/{record_id}/weekdays/{weekday}", delete(handlers::remove_weekday))
        .route("/records/{record_id}/dates/{date}", delete(handlers::remove_date))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
