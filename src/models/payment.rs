use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Proof-of-payment screenshot attached to a finalized booking.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub file_ref: String,
    pub file_unique_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}
