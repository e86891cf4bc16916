use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::ChatId;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::content::ContentRegistry;
use crate::database::Database;
use crate::models::UserIntent;

type IntentMap = Arc<RwLock<HashMap<ChatId, UserIntent>>>;

/// Shared handler state: the durable store, the content registry and the
/// per-user pending intents. Intents are in-memory only — a restart drops
/// unfinished dialogues, never finalized bookings.
#[derive(Clone)]
pub struct BotState {
    pub db: Database,
    pub content: ContentRegistry,
    pub config: Config,
    intents: IntentMap,
}

impl BotState {
    pub fn new(db: Database, content: ContentRegistry, config: Config) -> Self {
        Self {
            db,
            content,
            config,
            intents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn intent(&self, chat_id: ChatId) -> UserIntent {
        let intents = self.intents.read().await;
        intents.get(&chat_id).cloned().unwrap_or_default()
    }

    /// Replaces whatever intent was pending for this user, so a stale flag
    /// can never capture unrelated text later.
    pub async fn set_intent(&self, chat_id: ChatId, intent: UserIntent) {
        let mut intents = self.intents.write().await;
        intents.insert(chat_id, intent);
    }

    pub async fn clear_intent(&self, chat_id: ChatId) {
        let mut intents = self.intents.write().await;
        intents.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingSession, UserIntent};
    use tempfile::TempDir;

    async fn state() -> (TempDir, BotState) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("studio.db")).await.unwrap();
        db.init().await.unwrap();
        let content = ContentRegistry::new(db.clone()).await.unwrap();
        let config = Config {
            token: "token".to_string(),
            admin_ids: Default::default(),
            admin_chat_ids: Default::default(),
            database_path: dir.path().join("studio.db"),
            retention_days: 7,
        };
        (dir, BotState::new(db, content, config))
    }

    #[tokio::test]
    async fn setting_an_intent_supersedes_the_previous_one() {
        let (_dir, state) = state().await;
        let chat = ChatId(1);

        state.set_intent(chat, UserIntent::AwaitingBroadcast).await;
        state
            .set_intent(chat, UserIntent::InBooking(BookingSession::new(chat)))
            .await;

        assert!(matches!(state.intent(chat).await, UserIntent::InBooking(_)));

        state.clear_intent(chat).await;
        assert!(matches!(state.intent(chat).await, UserIntent::Idle));
    }

    #[tokio::test]
    async fn intents_are_independent_per_user() {
        let (_dir, state) = state().await;

        state
            .set_intent(ChatId(1), UserIntent::AwaitingBroadcast)
            .await;
        state
            .set_intent(ChatId(2), UserIntent::AwaitingContentEdit("about".to_string()))
            .await;
        state.clear_intent(ChatId(1)).await;

        assert!(matches!(state.intent(ChatId(1)).await, UserIntent::Idle));
        assert!(matches!(
            state.intent(ChatId(2)).await,
            UserIntent::AwaitingContentEdit(ref s) if s == "about"
        ));
    }
}
