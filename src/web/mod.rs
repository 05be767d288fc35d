use sqlx::SqlitePool;

use crate::services::notification_service::EmailNotifier;

pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub notifier: EmailNotifier,
}
