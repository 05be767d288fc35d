#[derive(Debug, sqlx::FromRow, Clone)]
pub struct ActivityRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub max_participants: i64,
    pub current_participants: i64,
    pub image_url: Option<String>,
}

/// Just the fields the registration guard needs to decide admission.
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct ActivityCapacityRow {
    pub id: String,
    pub title: String,
    pub end_date: Option<String>,
    pub max_participants: i64,
    pub current_participants: i64,
}
