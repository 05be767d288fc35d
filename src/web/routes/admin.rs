use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::warn;

use crate::services::activities_service::{self, ActivityInput};
use crate::web::AppState;

pub async fn create_activity_handler(
    State(state): State<AppState>,
    Json(input): Json<ActivityInput>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    validate_input(&input)?;

    let id = activities_service::create_activity(&state.pool, &input)
        .await
        .map_err(|e| {
            warn!("Activity create failed: {}", e);
            store_error()
        })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id })),
    ))
}

pub async fn update_activity_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
    Json(input): Json<ActivityInput>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    validate_input(&input)?;

    let updated = activities_service::update_activity(&state.pool, &activity_id, &input)
        .await
        .map_err(|e| {
            // Also reached when max_participants is lowered under the live
            // count; the CHECK constraint refuses that edit.
            warn!("Activity update failed for {}: {}", activity_id, e);
            store_error()
        })?;

    if !updated {
        return Err(not_found());
    }

    Ok(Json(serde_json::json!({ "id": activity_id })))
}

pub async fn delete_activity_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let deleted = activities_service::delete_activity(&state.pool, &activity_id)
        .await
        .map_err(|e| {
            warn!("Activity delete failed for {}: {}", activity_id, e);
            store_error()
        })?;

    if !deleted {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_registrations_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let rows = activities_service::list_registrations(&state.pool, &activity_id)
        .await
        .map_err(|e| {
            warn!("Registration list failed for {}: {}", activity_id, e);
            store_error()
        })?;

    let registrations: Vec<Value> = rows
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "first_name": r.first_name,
                "last_name": r.last_name,
                "email": r.email,
                "phone": r.phone,
                "created_at": r.created_at,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "registrations": registrations })))
}

pub async fn list_pre_registrations_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let rows = activities_service::list_pre_registrations(&state.pool, &activity_id)
        .await
        .map_err(|e| {
            warn!("Pre-registration list failed for {}: {}", activity_id, e);
            store_error()
        })?;

    let pre_registrations: Vec<Value> = rows
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "first_name": r.first_name,
                "last_name": r.last_name,
                "email": r.email,
                "phone": r.phone,
                "status": r.status,
                "created_at": r.created_at,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "pre_registrations": pre_registrations })))
}

fn validate_input(input: &ActivityInput) -> Result<(), (StatusCode, Json<Value>)> {
    if input.title.trim().is_empty() {
        return Err(validation("title is required"));
    }
    if input.start_date.trim().is_empty() {
        return Err(validation("start_date is required"));
    }
    if input.max_participants < 1 {
        return Err(validation("max_participants must be at least 1"));
    }
    Ok(())
}

fn validation(detail: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({ "error": "validation", "detail": detail })),
    )
}

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not_found" })),
    )
}

fn store_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "store" })),
    )
}
