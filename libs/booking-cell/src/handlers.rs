use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::BookingDraft;
use crate::services::BookingWriter;

/// Accepts the finished wizard draft and books the chosen slot.
#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(draft): Json<BookingDraft>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request = draft.complete()?;

    let writer = BookingWriter::new(&state);
    let receipt = writer.submit(request).await?;

    Ok((StatusCode::CREATED, Json(json!(receipt))))
}
