use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::warn;

use crate::services::activities_service;
use crate::services::registration_service::{
    self, AttendeeForm, RegistrationError,
};
use crate::web::AppState;

pub async fn list_activities_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let views = activities_service::list_activity_views(&state.pool)
        .await
        .map_err(|e| {
            warn!("Activity list failed: {}", e);
            store_error()
        })?;

    Ok(Json(serde_json::json!({ "activities": views })))
}

pub async fn activity_detail_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let view = activities_service::load_activity_view(&state.pool, &activity_id)
        .await
        .map_err(|e| {
            warn!("Activity load failed for {}: {}", activity_id, e);
            store_error()
        })?;

    let Some(view) = view else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not_found" })),
        ));
    };

    Ok(Json(serde_json::json!({ "activity": view })))
}

pub async fn register_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
    Json(form): Json<AttendeeForm>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let admitted =
        registration_service::register_attendee(&state.pool, &state.notifier, &activity_id, &form)
            .await
            .map_err(|e| registration_error_response(&activity_id, e))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "registration_id": admitted.registration_id })),
    ))
}

pub async fn pre_register_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
    Json(form): Json<AttendeeForm>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let pre_registration_id =
        registration_service::pre_register_attendee(&state.pool, &activity_id, &form)
            .await
            .map_err(|e| registration_error_response(&activity_id, e))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "pre_registration_id": pre_registration_id })),
    ))
}

// "Full" and "closed" get distinct error codes: the right next step differs
// (try another activity vs. leave a pre-registration).
fn registration_error_response(
    activity_id: &str,
    error: RegistrationError,
) -> (StatusCode, Json<Value>) {
    match error {
        RegistrationError::Validation(detail) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": "validation", "detail": detail })),
        ),
        RegistrationError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not_found" })),
        ),
        RegistrationError::RegistrationClosed => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "registration_closed" })),
        ),
        RegistrationError::CapacityExceeded => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "activity_full" })),
        ),
        RegistrationError::Store(e) => {
            warn!("Registration store error for {}: {}", activity_id, e);
            store_error()
        }
    }
}

fn store_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "store" })),
    )
}
