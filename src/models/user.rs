use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use teloxide::types::User as TelegramUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub transport_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub locale: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Attributes collected from an inbound update; upserted keyed by transport id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub transport_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub locale: Option<String>,
}

impl NewUser {
    pub fn from_telegram(user: &TelegramUser) -> Self {
        Self {
            transport_id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
            locale: user.language_code.clone(),
        }
    }
}
