#[derive(Debug, sqlx::FromRow, Clone)]
pub struct RegistrationRow {
    pub id: String,
    pub activity_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: String,
}
