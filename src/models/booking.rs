use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub contact: String,
    pub preferred_date: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub full_name: String,
    pub contact: String,
    pub preferred_date: String,
    pub notes: Option<String>,
}
