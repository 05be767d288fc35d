use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::database::{activities_repo, pre_registrations_repo, registrations_repo};
use crate::models::{ActivityRow, PreRegistrationRow, RegistrationRow};
use crate::services::registration_service::registration_window_closed;

/// Activity as shown to the public pages: capacity already worked out so the
/// frontend never does its own counter arithmetic.
#[derive(Debug, Serialize)]
pub struct ActivityView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub max_participants: i64,
    pub current_participants: i64,
    pub spots_left: i64,
    pub is_full: bool,
    pub registration_closed: bool,
    pub image_url: Option<String>,
}

pub async fn list_activity_views(pool: &SqlitePool) -> sqlx::Result<Vec<ActivityView>> {
    let rows = activities_repo::list_activities(pool).await?;
    Ok(rows.into_iter().map(build_view).collect())
}

pub async fn load_activity_view(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<Option<ActivityView>> {
    let row = activities_repo::load_activity_by_id(pool, activity_id).await?;
    Ok(row.map(build_view))
}

fn build_view(row: ActivityRow) -> ActivityView {
    let spots_left = (row.max_participants - row.current_participants).max(0);
    let registration_closed = registration_window_closed(row.end_date.as_deref(), Utc::now());

    ActivityView {
        id: row.id,
        title: row.title,
        description: row.description,
        location: row.location,
        start_date: row.start_date,
        end_date: row.end_date,
        max_participants: row.max_participants,
        current_participants: row.current_participants,
        spots_left,
        is_full: spots_left == 0,
        registration_closed,
        image_url: row.image_url,
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct ActivityInput {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub max_participants: i64,
    pub image_url: Option<String>,
}

pub async fn create_activity(pool: &SqlitePool, input: &ActivityInput) -> sqlx::Result<String> {
    let id = uuid::Uuid::new_v4().to_string();
    activities_repo::insert_activity(
        pool,
        activities_repo::NewActivity {
            id: &id,
            title: input.title.trim(),
            description: input.description.as_deref(),
            location: input.location.as_deref(),
            start_date: input.start_date.trim(),
            end_date: input.end_date.as_deref(),
            max_participants: input.max_participants,
            image_url: input.image_url.as_deref(),
        },
    )
    .await?;
    Ok(id)
}

pub async fn update_activity(
    pool: &SqlitePool,
    activity_id: &str,
    input: &ActivityInput,
) -> sqlx::Result<bool> {
    let affected = activities_repo::update_activity(
        pool,
        activity_id,
        activities_repo::ActivityUpdate {
            title: input.title.trim(),
            description: input.description.as_deref(),
            location: input.location.as_deref(),
            start_date: input.start_date.trim(),
            end_date: input.end_date.as_deref(),
            max_participants: input.max_participants,
            image_url: input.image_url.as_deref(),
        },
    )
    .await?;
    Ok(affected > 0)
}

pub async fn delete_activity(pool: &SqlitePool, activity_id: &str) -> sqlx::Result<bool> {
    let affected = activities_repo::delete_activity(pool, activity_id).await?;
    Ok(affected > 0)
}

pub async fn list_registrations(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<Vec<RegistrationRow>> {
    registrations_repo::list_registrations_by_activity(pool, activity_id).await
}

pub async fn list_pre_registrations(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<Vec<PreRegistrationRow>> {
    pre_registrations_repo::list_pre_registrations_by_activity(pool, activity_id).await
}
