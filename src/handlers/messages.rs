use std::error::Error;

use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::database::StorageError;
use crate::handlers::broadcast::broadcast_copy;
use crate::handlers::utils::{
    main_menu_keyboard, section_title, BTN_ABOUT, BTN_BOOK, BTN_CONTACTS, BTN_SCHEDULE,
    BTN_TEACHERS, GENERIC_FAILURE,
};
use crate::models::session::{date_prompt, parse_lesson_time};
use crate::models::{BookingSession, BookingStep, NewBooking, NewUser, StepOutcome, UserIntent};

const STALE_DIALOGUE: &str = "⚠️ Диалог не найден. Начните заново из меню.";

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    // Idempotent upsert on every interaction; the internal id is needed
    // further down to finalize a booking.
    let user_db_id = match msg.from.as_ref() {
        Some(user) => match state.db.upsert_user(&NewUser::from_telegram(user)).await {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("Error upserting user {}: {}", user.id, e);
                None
            }
        },
        None => None,
    };

    if msg.photo().is_some() {
        return photo_handler(&bot, &msg, &state).await;
    }

    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "Выберите действие в меню 👇")
            .reply_markup(main_menu_keyboard())
            .await?;
        return Ok(());
    };

    // Commands are already handled in command_handler.
    if text.starts_with('/') {
        return Ok(());
    }

    match text {
        BTN_BOOK => start_booking(&bot, chat_id, &state).await?,
        BTN_ABOUT => send_section(&bot, chat_id, &state, "about").await?,
        BTN_TEACHERS => send_section(&bot, chat_id, &state, "teachers").await?,
        BTN_SCHEDULE => send_section(&bot, chat_id, &state, "schedule").await?,
        BTN_CONTACTS => send_section(&bot, chat_id, &state, "contacts").await?,
        _ => route_free_text(&bot, &msg, &state, user_db_id, text).await?,
    }

    Ok(())
}

/// Opens a fresh booking dialogue, superseding any pending intent.
async fn start_booking(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    state
        .set_intent(chat_id, UserIntent::InBooking(BookingSession::new(chat_id)))
        .await;

    bot.send_message(
        chat_id,
        "📝 Запись на пробный урок\n\nКак вас зовут? Напишите имя и фамилию:",
    )
    .await?;

    Ok(())
}

async fn send_section(
    bot: &Bot,
    chat_id: ChatId,
    state: &BotState,
    section: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match state.content.get(section).await {
        Ok(text) => {
            bot.send_message(chat_id, text).await?;
        }
        Err(e) => {
            log::error!("Error reading content section {}: {}", section, e);
            bot.send_message(chat_id, GENERIC_FAILURE).await?;
        }
    }
    Ok(())
}

/// Free text is either a booking step, a pending broadcast body, a pending
/// content edit, or nothing at all.
async fn route_free_text(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_db_id: Option<i64>,
    text: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    match state.intent(chat_id).await {
        UserIntent::InBooking(mut session) => {
            advance_booking(bot, state, user_db_id, &mut session, text).await?;
        }
        UserIntent::AwaitingBroadcast => {
            run_broadcast(bot, msg, state).await?;
        }
        UserIntent::AwaitingContentEdit(section) => {
            apply_content_edit(bot, msg, state, &section, text).await?;
        }
        UserIntent::Idle => {
            bot.send_message(chat_id, "Выберите действие в меню 👇")
                .reply_markup(main_menu_keyboard())
                .await?;
        }
    }

    Ok(())
}

async fn advance_booking(
    bot: &Bot,
    state: &BotState,
    user_db_id: Option<i64>,
    session: &mut BookingSession,
    text: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = session.chat_id;

    match session.apply_text(text) {
        StepOutcome::AskContact => {
            bot.send_message(chat_id, "Оставьте контакт для связи (телефон или @username):")
                .await?;
        }
        StepOutcome::AskDate => {
            let previous = match user_db_id {
                Some(id) => state
                    .db
                    .last_booking(id)
                    .await
                    .ok()
                    .flatten()
                    .and_then(|b| parse_lesson_time(&b.preferred_date)),
                None => None,
            };
            bot.send_message(chat_id, date_prompt(previous)).await?;
        }
        StepOutcome::InvalidDate => {
            bot.send_message(
                chat_id,
                "⚠️ Не получилось разобрать дату. Нужен формат ДД.ММ.ГГГГ, \
                 например 15.06.2024. Попробуйте ещё раз:",
            )
            .await?;
        }
        StepOutcome::AskNotes => {
            bot.send_message(chat_id, "Пожелания к занятию? Если их нет, отправьте «-»:")
                .await?;
        }
        StepOutcome::Finalize => {
            finalize_booking(bot, state, user_db_id, session).await?;
        }
        StepOutcome::RepeatPhoto => {
            bot.send_message(
                chat_id,
                "📷 Пришлите, пожалуйста, скриншот оплаты одним фото. Отменить запись: /cancel",
            )
            .await?;
        }
    }

    state
        .set_intent(chat_id, UserIntent::InBooking(session.clone()))
        .await;

    Ok(())
}

/// The booking becomes durable here, before any payment: administrators can
/// follow up on the lead even if the screenshot never arrives.
async fn finalize_booking(
    bot: &Bot,
    state: &BotState,
    user_db_id: Option<i64>,
    session: &mut BookingSession,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = session.chat_id;

    let (Some(user_id), Some(full_name), Some(contact), Some(preferred_date)) = (
        user_db_id,
        session.full_name.clone(),
        session.contact.clone(),
        session.preferred_date.clone(),
    ) else {
        log::error!("Booking for chat {} cannot be finalized: missing fields", chat_id);
        session.step = BookingStep::Notes;
        bot.send_message(chat_id, GENERIC_FAILURE).await?;
        return Ok(());
    };

    let new_booking = NewBooking {
        user_id,
        full_name,
        contact,
        preferred_date,
        notes: session.notes.clone(),
    };

    match persist_booking(state, &new_booking, session).await {
        Ok(booking_id) => {
            log::info!("📝 Booking {} created for chat {}", booking_id, chat_id);

            bot.send_message(
                chat_id,
                format!(
                    "✅ Заявка №{} принята!\n\n\
                     Чтобы подтвердить запись, оплатите пробный урок и пришлите \
                     скриншот оплаты одним фото.\nОтменить запись: /cancel",
                    booking_id
                ),
            )
            .await?;
        }
        Err(e) => {
            log::error!("Error saving booking for chat {}: {}", chat_id, e);
            // Roll back to the notes step so the user can simply retry.
            session.step = BookingStep::Notes;
            bot.send_message(chat_id, GENERIC_FAILURE).await?;
        }
    }

    Ok(())
}

/// Inserts the booking and stores the advanced session in one go, before any
/// confirmation goes out. A send that fails afterwards must not leave the
/// stored dialogue at the notes step, or a retry would insert a duplicate.
async fn persist_booking(
    state: &BotState,
    booking: &NewBooking,
    session: &mut BookingSession,
) -> Result<i64, StorageError> {
    let booking_id = state.db.create_booking(booking, false).await?;
    session.booking_id = Some(booking_id);
    state
        .set_intent(session.chat_id, UserIntent::InBooking(session.clone()))
        .await;
    Ok(booking_id)
}

async fn photo_handler(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    match state.intent(chat_id).await {
        UserIntent::AwaitingBroadcast => {
            run_broadcast(bot, msg, state).await?;
        }
        UserIntent::InBooking(session) if session.step == BookingStep::Payment => {
            let Some(booking_id) = session.booking_id else {
                state.clear_intent(chat_id).await;
                bot.send_message(chat_id, STALE_DIALOGUE)
                    .reply_markup(main_menu_keyboard())
                    .await?;
                return Ok(());
            };

            attach_payment(bot, msg, state, booking_id).await?;
        }
        UserIntent::InBooking(_) => {
            bot.send_message(
                chat_id,
                "⚠️ Сначала закончим оформление заявки, фото понадобится на шаге оплаты.",
            )
            .await?;
        }
        UserIntent::AwaitingContentEdit(_) => {
            bot.send_message(chat_id, "✏️ Пришлите текст раздела обычным сообщением.")
                .await?;
        }
        UserIntent::Idle => {
            bot.send_message(chat_id, STALE_DIALOGUE)
                .reply_markup(main_menu_keyboard())
                .await?;
        }
    }

    Ok(())
}

async fn attach_payment(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    booking_id: i64,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    // The largest size is last; its file reference is what support needs.
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };

    match state
        .db
        .save_payment(
            booking_id,
            &photo.file.id.0,
            Some(photo.file.unique_id.0.as_str()),
        )
        .await
    {
        Ok(_) => {
            state.clear_intent(chat_id).await;
            log::info!("💳 Payment attached to booking {}", booking_id);

            bot.send_message(
                chat_id,
                format!(
                    "🎉 Оплата получена, заявка №{} подтверждена!\n\
                     Мы свяжемся с вами, чтобы согласовать время занятия.",
                    booking_id
                ),
            )
            .reply_markup(main_menu_keyboard())
            .await?;
        }
        Err(e) => {
            log::error!("Error saving payment for booking {}: {}", booking_id, e);
            bot.send_message(chat_id, GENERIC_FAILURE).await?;
        }
    }

    Ok(())
}

/// Copies the admin's message to every known user and reports the count.
async fn run_broadcast(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;
    let from = msg.from.as_ref().map(|user| user.id);

    if !state.config.is_admin(from, chat_id) {
        log::warn!("🔒 Broadcast body from non-admin {:?}, ignoring", from);
        state.clear_intent(chat_id).await;
        return Ok(());
    }

    state.clear_intent(chat_id).await;

    let recipients = match state.db.list_user_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            log::error!("Error listing broadcast recipients: {}", e);
            bot.send_message(chat_id, GENERIC_FAILURE).await?;
            return Ok(());
        }
    };

    let summary = broadcast_copy(bot, chat_id, msg.id, &recipients).await;
    log::info!(
        "📢 Broadcast from {}: {} delivered, {} failed",
        chat_id,
        summary.delivered,
        summary.failed.len()
    );

    bot.send_message(
        chat_id,
        format!(
            "📢 Рассылка завершена: доставлено {} из {}.",
            summary.delivered,
            summary.attempted()
        ),
    )
    .await?;

    Ok(())
}

async fn apply_content_edit(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    section: &str,
    text: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;
    let from = msg.from.as_ref().map(|user| user.id);

    if !state.config.is_admin(from, chat_id) {
        log::warn!("🔒 Content edit from non-admin {:?}, ignoring", from);
        state.clear_intent(chat_id).await;
        return Ok(());
    }

    state.clear_intent(chat_id).await;

    match state.content.set(section, text).await {
        Ok(()) => {
            bot.send_message(
                chat_id,
                format!("✅ Раздел «{}» обновлён.", section_title(section)),
            )
            .await?;
        }
        Err(e) => {
            log::error!("Error updating content section {}: {}", section, e);
            bot.send_message(chat_id, GENERIC_FAILURE).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::content::ContentRegistry;
    use crate::database::Database;
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
    async fn finalized_session_is_stored_before_any_confirmation() {
        let (_dir, state) = state().await;
        let chat = ChatId(42);

        let user_id = state
            .db
            .upsert_user(&NewUser {
                transport_id: 42,
                username: None,
                first_name: Some("Алиса".to_string()),
                last_name: None,
                locale: None,
            })
            .await
            .unwrap();

        let mut session = BookingSession::new(chat);
        session.apply_text("Алиса Иванова");
        session.apply_text("+79990001122");
        session.apply_text("15.06.2024");
        assert_eq!(session.apply_text("-"), StepOutcome::Finalize);

        let booking = NewBooking {
            user_id,
            full_name: session.full_name.clone().unwrap(),
            contact: session.contact.clone().unwrap(),
            preferred_date: session.preferred_date.clone().unwrap(),
            notes: session.notes.clone(),
        };
        let booking_id = persist_booking(&state, &booking, &mut session).await.unwrap();

        // The stored intent already carries the advanced session, even though
        // no confirmation was sent: a lost confirmation cannot re-run the
        // notes step and insert a second row.
        let UserIntent::InBooking(mut stored) = state.intent(chat).await else {
            panic!("intent must stay in the booking dialogue");
        };
        assert_eq!(stored.step, BookingStep::Payment);
        assert_eq!(stored.booking_id, Some(booking_id));
        assert_eq!(stored.apply_text("ещё раз -"), StepOutcome::RepeatPhoto);

        assert_eq!(state.db.list_bookings(Some(user_id)).await.unwrap().len(), 1);
    }
}
