use std::future::Future;

use teloxide::prelude::*;
use teloxide::types::MessageId;

/// Per-recipient outcome of a fan-out. Failures are collected, never raised:
/// a blocked bot or deactivated account must not abort the remaining
/// deliveries.
#[derive(Debug, Default)]
pub struct BroadcastSummary {
    pub delivered: usize,
    pub failed: Vec<(i64, String)>,
}

impl BroadcastSummary {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

/// Sequential best-effort fan-out; at most one attempt per recipient.
pub async fn fan_out<F, Fut, E>(recipients: &[i64], mut deliver: F) -> BroadcastSummary
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut summary = BroadcastSummary::default();

    for &chat_id in recipients {
        match deliver(chat_id).await {
            Ok(()) => summary.delivered += 1,
            Err(e) => {
                log::warn!("📭 Broadcast to {} failed: {}", chat_id, e);
                summary.failed.push((chat_id, e.to_string()));
            }
        }
    }

    summary
}

/// Copies the admin's message to every known user.
pub async fn broadcast_copy(
    bot: &Bot,
    from_chat: ChatId,
    message_id: MessageId,
    recipients: &[i64],
) -> BroadcastSummary {
    fan_out(recipients, |chat_id| {
        let bot = bot.clone();
        async move {
            bot.copy_message(ChatId(chat_id), from_chat, message_id)
                .await
                .map(|_| ())
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_are_skipped_not_raised() {
        let recipients = [1, 2, 3, 4];
        let summary = fan_out(&recipients, |chat_id| async move {
            if chat_id % 2 == 0 {
                Err(format!("blocked by {}", chat_id))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.attempted(), 4);
        let failed_ids: Vec<i64> = summary.failed.iter().map(|(id, _)| *id).collect();
        assert_eq!(failed_ids, [2, 4]);
    }

    #[tokio::test]
    async fn empty_recipient_list_is_a_no_op() {
        let summary = fan_out(&[], |_| async move { Ok::<(), String>(()) }).await;
        assert_eq!(summary.delivered, 0);
        assert!(summary.failed.is_empty());
    }
}
