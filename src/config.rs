use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use teloxide::types::{ChatId, UserId};

pub const DEFAULT_DATABASE_PATH: &str = "data/studio.db";
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

#[derive(Debug)]
pub enum ConfigError {
    MissingToken,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingToken => write!(f, "BOT_TOKEN must be set"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    /// Admin privilege by sender id; authoritative.
    pub admin_ids: HashSet<u64>,
    /// Separate allowance for chats whose updates carry no sender.
    pub admin_chat_ids: HashSet<i64>,
    pub database_path: PathBuf,
    pub retention_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingToken)?;

        let admin_ids = parse_id_list(&env::var("ADMIN_IDS").unwrap_or_default());
        let admin_chat_ids = parse_id_list(&env::var("ADMIN_CHAT_IDS").unwrap_or_default());

        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_PATH));

        let retention_days = env::var("BOOKING_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETENTION_DAYS);

        Ok(Self {
            token,
            admin_ids,
            admin_chat_ids,
            database_path,
            retention_days,
        })
    }

    /// Admin-by-user-id regardless of chat; the chat allowance only applies
    /// when the update carries no sender at all.
    pub fn is_admin(&self, from: Option<UserId>, chat: ChatId) -> bool {
        match from {
            Some(user) => self.admin_ids.contains(&user.0),
            None => self.admin_chat_ids.contains(&chat.0),
        }
    }
}

fn parse_id_list<T: std::str::FromStr + std::hash::Hash + Eq>(raw: &str) -> HashSet<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            token: "token".to_string(),
            admin_ids: HashSet::from([100]),
            admin_chat_ids: HashSet::from([-500]),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    #[test]
    fn parses_comma_separated_ids() {
        let ids: HashSet<u64> = parse_id_list("1, 2,3,,junk");
        assert_eq!(ids, HashSet::from([1, 2, 3]));
        assert!(parse_id_list::<u64>("").is_empty());
    }

    #[test]
    fn admin_sender_is_admin_in_any_chat() {
        let cfg = config();
        assert!(cfg.is_admin(Some(UserId(100)), ChatId(1)));
        assert!(cfg.is_admin(Some(UserId(100)), ChatId(-999)));
    }

    #[test]
    fn missing_sender_falls_back_to_chat_allowance() {
        let cfg = config();
        assert!(cfg.is_admin(None, ChatId(-500)));
        assert!(!cfg.is_admin(None, ChatId(1)));
    }

    #[test]
    fn other_senders_are_denied_even_in_admin_chats() {
        let cfg = config();
        assert!(!cfg.is_admin(Some(UserId(200)), ChatId(-500)));
        assert!(!cfg.is_admin(Some(UserId(200)), ChatId(1)));
    }
}
