use sqlx::SqlitePool;

use crate::models::RegistrationRow;

const SQL_INSERT_REGISTRATION: &str = r#"
INSERT INTO registrations (
  id,
  activity_id,
  first_name,
  last_name,
  email,
  phone
) VALUES (?, ?, ?, ?, ?, ?)
"#;

pub struct NewRegistration<'a> {
    pub id: &'a str,
    pub activity_id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
}

pub async fn insert_registration(
    pool: &SqlitePool,
    registration: NewRegistration<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_REGISTRATION)
        .bind(registration.id)
        .bind(registration.activity_id)
        .bind(registration.first_name)
        .bind(registration.last_name)
        .bind(registration.email)
        .bind(registration.phone)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// Compensating rollback for a registration whose counter increment lost the
// race. Keyed on (activity_id, email), matching what the insert wrote.
const SQL_DELETE_REGISTRATION: &str = r#"
DELETE FROM registrations
WHERE activity_id = ? AND email = ?
"#;

pub async fn delete_registration(
    pool: &SqlitePool,
    activity_id: &str,
    email: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_REGISTRATION)
        .bind(activity_id)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_LIST_BY_ACTIVITY: &str = r#"
SELECT
  id,
  activity_id,
  first_name,
  last_name,
  email,
  phone,
  created_at
FROM registrations
WHERE activity_id = ?
ORDER BY datetime(created_at) ASC
"#;

pub async fn list_registrations_by_activity(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<Vec<RegistrationRow>> {
    sqlx::query_as::<_, RegistrationRow>(SQL_LIST_BY_ACTIVITY)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

const SQL_COUNT_BY_ACTIVITY: &str = r#"
SELECT COUNT(*)
FROM registrations
WHERE activity_id = ?
"#;

pub async fn count_registrations_by_activity(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<i64> {
    sqlx::query_scalar::<_, i64>(SQL_COUNT_BY_ACTIVITY)
        .bind(activity_id)
        .fetch_one(pool)
        .await
}
