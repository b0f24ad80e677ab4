use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;
use shared_utils::AppState;

use crate::models::{
    CalendarQuery, SaveFixedScheduleRequest, SaveRotatingScheduleRequest, SlotsQuery, Weekday,
};
use crate::services::{AvailabilityEditorService, SlotPickerService};

// ==============================================================================
// PUBLIC HANDLERS (SLOT PICKER)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppState>,
    Path(physician_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let picker = SlotPickerService::new(&state);
    let day = picker.available_slots(&physician_id, query.date).await?;

    Ok(Json(json!(day)))
}

#[axum::debug_handler]
pub async fn get_month_calendar(
    State(state): State<AppState>,
    Path(physician_id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let picker = SlotPickerService::new(&state);
    let days = picker.month_calendar(&physician_id, query.year, query.month).await?;

    Ok(Json(json!({
        "physician_id": physician_id,
        "year": query.year,
        "month": query.month,
        "days": days,
    })))
}

// ==============================================================================
// PROTECTED HANDLERS (SLOT EDITOR)
// ==============================================================================

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(physician_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let editor = AvailabilityEditorService::new(&state);
    let schedule = editor.get_schedule(&physician_id).await?;

    Ok(Json(json!(schedule.to_view())))
}

#[axum::debug_handler]
pub async fn save_fixed_schedule(
    State(state): State<AppState>,
    Path(physician_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<SaveFixedScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let editor = AvailabilityEditorService::new(&state);
    let record = editor.save_fixed(&physician_id, request).await?;

    Ok(Json(json!(record.to_view())))
}

#[axum::debug_handler]
pub async fn save_rotating_schedule(
    State(state): State<AppState>,
    Path(physician_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<SaveRotatingScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let editor = AvailabilityEditorService::new(&state);
    let record = editor.save_rotating(&physician_id, request).await?;

    Ok(Json(json!(record.to_view())))
}

#[axum::debug_handler]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let editor = AvailabilityEditorService::new(&state);
    editor.delete_record(&record_id).await?;

    Ok(Json(json!({
        "success": true,
        "deleted": record_id,
    })))
}

#[axum::debug_handler]
pub async fn remove_weekday(
    State(state): State<AppState>,
    Path((record_id, weekday)): Path<(String, String)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let weekday: Weekday = weekday.parse()?;

    let editor = AvailabilityEditorService::new(&state);
    let record = editor.remove_weekday(&record_id, weekday).await?;

    Ok(Json(json!(record.to_view())))
}

#[axum::debug_handler]
pub async fn remove_date(
    State(state): State<AppState>,
    Path((record_id, date)): Path<(String, String)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", date)))?;

    let editor = AvailabilityEditorService::new(&state);
    let record = editor.remove_date(&record_id, date).await?;

    Ok(Json(json!(record.to_view())))
}
