use sqlx::SqlitePool;

use crate::models::{ActivityCapacityRow, ActivityRow};

const SQL_LIST_ACTIVITIES: &str = r#"
SELECT
  id,
  title,
  description,
  location,
  start_date,
  end_date,
  max_participants,
  current_participants,
  image_url
FROM activities
ORDER BY datetime(start_date) ASC
"#;

pub async fn list_activities(pool: &SqlitePool) -> sqlx::Result<Vec<ActivityRow>> {
    sqlx::query_as::<_, ActivityRow>(SQL_LIST_ACTIVITIES)
        .fetch_all(pool)
        .await
}

const SQL_LOAD_ACTIVITY: &str = r#"
SELECT
  id,
  title,
  description,
  location,
  start_date,
  end_date,
  max_participants,
  current_participants,
  image_url
FROM activities
WHERE id = ?
"#;

pub async fn load_activity_by_id(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<Option<ActivityRow>> {
    sqlx::query_as::<_, ActivityRow>(SQL_LOAD_ACTIVITY)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

const SQL_LOAD_CAPACITY: &str = r#"
SELECT
  id,
  title,
  end_date,
  max_participants,
  current_participants
FROM activities
WHERE id = ?
"#;

pub async fn load_activity_capacity(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<Option<ActivityCapacityRow>> {
    sqlx::query_as::<_, ActivityCapacityRow>(SQL_LOAD_CAPACITY)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

// The WHERE clause repeats the count we read earlier, so a concurrent
// registration that already bumped the counter makes this a no-op
// (rows_affected 0) instead of an overbooking.
const SQL_CONDITIONAL_INCREMENT: &str = r#"
UPDATE activities
SET current_participants = ?
WHERE id = ? AND current_participants = ?
"#;

pub async fn conditional_increment_participants(
    pool: &SqlitePool,
    activity_id: &str,
    expected_count: i64,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_CONDITIONAL_INCREMENT)
        .bind(expected_count + 1)
        .bind(activity_id)
        .bind(expected_count)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_INSERT_ACTIVITY: &str = r#"
INSERT INTO activities (
  id,
  title,
  description,
  location,
  start_date,
  end_date,
  max_participants,
  current_participants,
  image_url
) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
"#;

pub struct NewActivity<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub start_date: &'a str,
    pub end_date: Option<&'a str>,
    pub max_participants: i64,
    pub image_url: Option<&'a str>,
}

pub async fn insert_activity(pool: &SqlitePool, activity: NewActivity<'_>) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_ACTIVITY)
        .bind(activity.id)
        .bind(activity.title)
        .bind(activity.description)
        .bind(activity.location)
        .bind(activity.start_date)
        .bind(activity.end_date)
        .bind(activity.max_participants)
        .bind(activity.image_url)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// Admin edit. current_participants is deliberately not settable here; the
// CHECK constraint rejects lowering max_participants under the live count.
const SQL_UPDATE_ACTIVITY: &str = r#"
UPDATE activities
SET
  title = ?,
  description = ?,
  location = ?,
  start_date = ?,
  end_date = ?,
  max_participants = ?,
  image_url = ?
WHERE id = ?
"#;

pub struct ActivityUpdate<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub start_date: &'a str,
    pub end_date: Option<&'a str>,
    pub max_participants: i64,
    pub image_url: Option<&'a str>,
}

pub async fn update_activity(
    pool: &SqlitePool,
    activity_id: &str,
    update: ActivityUpdate<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_ACTIVITY)
        .bind(update.title)
        .bind(update.description)
        .bind(update.location)
        .bind(update.start_date)
        .bind(update.end_date)
        .bind(update.max_participants)
        .bind(update.image_url)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_ACTIVITY: &str = r#"
DELETE FROM activities
WHERE id = ?
"#;

pub async fn delete_activity(pool: &SqlitePool, activity_id: &str) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_ACTIVITY)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
