use sqlx::SqlitePool;

use crate::models::PreRegistrationRow;

const SQL_INSERT_PRE_REGISTRATION: &str = r#"
INSERT INTO pre_registrations (
  id,
  activity_id,
  first_name,
  last_name,
  email,
  phone,
  status
) VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

pub struct NewPreRegistration<'a> {
    pub id: &'a str,
    pub activity_id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub status: &'a str,
}

pub async fn insert_pre_registration(
    pool: &SqlitePool,
    pre_registration: NewPreRegistration<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_PRE_REGISTRATION)
        .bind(pre_registration.id)
        .bind(pre_registration.activity_id)
        .bind(pre_registration.first_name)
        .bind(pre_registration.last_name)
        .bind(pre_registration.email)
        .bind(pre_registration.phone)
        .bind(pre_registration.status)
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
  status,
  created_at
FROM pre_registrations
WHERE activity_id = ?
ORDER BY datetime(created_at) ASC
"#;

pub async fn list_pre_registrations_by_activity(
    pool: &SqlitePool,
    activity_id: &str,
) -> sqlx::Result<Vec<PreRegistrationRow>> {
    sqlx::query_as::<_, PreRegistrationRow>(SQL_LIST_BY_ACTIVITY)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}
