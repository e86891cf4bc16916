use std::collections::HashSet;
use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot_state::BotState;
use crate::handlers::utils::{format_bookings_overview, section_title, GENERIC_FAILURE};
use crate::models::UserIntent;

/// Admin panel buttons. Every callback here is privileged, so a single gate
/// up front is enough; unauthorized presses are logged and ignored.
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };

    let chat_id = message.chat().id;
    let message_id = message.id();

    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("Error answering callback query {}: {}", q.id.0, e);
    }

    if !state.config.is_admin(Some(q.from.id), chat_id) {
        log::warn!("🔒 Unauthorized callback {:?} from {}", data, q.from.id);
        return Ok(());
    }

    match data {
        "admin_broadcast" => {
            state.set_intent(chat_id, UserIntent::AwaitingBroadcast).await;

            bot.edit_message_text(
                chat_id,
                message_id,
                "📢 Отправьте сообщение для рассылки — оно будет скопировано \
                 всем пользователям.\nОтменить: /cancel",
            )
            .await?;
        }

        "admin_bookings" => {
            show_bookings(&bot, chat_id, message_id, &state).await?;
        }

        data if data.starts_with("edit_") => {
            let section = data.strip_prefix("edit_").unwrap();
            state
                .set_intent(chat_id, UserIntent::AwaitingContentEdit(section.to_string()))
                .await;

            bot.edit_message_text(
                chat_id,
                message_id,
                format!(
                    "✏️ Отправьте новый текст раздела «{}».\nОтменить: /cancel",
                    section_title(section)
                ),
            )
            .await?;
        }

        _ => {}
    }

    Ok(())
}

async fn show_bookings(
    bot: &Bot,
    chat_id: ChatId,
    message_id: teloxide::types::MessageId,
    state: &BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listing = async {
        let bookings = state.db.list_bookings(None).await?;
        let payments = state.db.list_payments(None).await?;
        Ok::<_, crate::database::StorageError>((bookings, payments))
    }
    .await;

    match listing {
        Ok((bookings, payments)) => {
            let paid: HashSet<i64> = payments.iter().map(|p| p.booking_id).collect();

            bot.edit_message_text(
                chat_id,
                message_id,
                format_bookings_overview(&bookings, &paid),
            )
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
        }
        Err(e) => {
            log::error!("Error listing bookings: {}", e);
            bot.send_message(chat_id, GENERIC_FAILURE).await?;
        }
    }

    Ok(())
}
