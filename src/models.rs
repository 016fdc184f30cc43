use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

pub const USER_TYPE_STUDIO: &str = "studio";
pub const USER_TYPE_PHOTOGRAPHER: &str = "photographer";

/// Column list shared by every `SELECT` that feeds [`UserRow`].
pub const USER_COLUMNS: &str =
    "id, email, phone_number, display_name, password_hash, is_admin";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub display_name: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StudioProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PhotographerProfile {
    pub id: String,
    pub user_id: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: String,
    #[sqlx(rename = "executor_id")]
    pub executor: String,
    pub weekday: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    #[sqlx(rename = "executor_id")]
    pub executor: String,
    #[sqlx(rename = "client_id")]
    pub client: String,
    #[sqlx(rename = "schedule_id")]
    pub schedule: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
