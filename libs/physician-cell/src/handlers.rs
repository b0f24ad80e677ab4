use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::DirectoryQuery;
use crate::services::PhysicianDirectory;

#[axum::debug_handler]
pub async fn list_eligible_physicians(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = PhysicianDirectory::new(&state);
    let physicians = directory.eligible_physicians(query).await?;

    Ok(Json(json!({
        "physicians": physicians,
        "total": physicians.len()
    })))
}
