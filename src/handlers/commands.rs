use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot_state::BotState;
use crate::handlers::utils::{admin_panel_keyboard, main_menu_keyboard};
use crate::models::NewUser;
use crate::Command;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await?,
        Command::Help => handle_help(bot, msg).await?,
        Command::Cancel => handle_cancel(bot, msg, state).await?,
        Command::Admin => handle_admin(bot, msg, state).await?,
    }
    Ok(())
}

async fn handle_start(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(user) = msg.from.as_ref() {
        if let Err(e) = state.db.upsert_user(&NewUser::from_telegram(user)).await {
            log::error!("Error upserting user {}: {}", user.id, e);
        }
    }

    let start_text = "👋 *Добро пожаловать в студию иностранных языков «Лингва»\\!*\n\n\
        Я помогу записаться на пробный урок и расскажу о студии\\.\n\n\
        📋 *Команды:*\n\
        /start – начать работу\n\
        /help – помощь\n\
        /cancel – отменить текущее действие\n\n\
        Выберите действие в меню 👇";

    bot.send_message(msg.chat.id, start_text)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(main_menu_keyboard())
        .await?;

    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_message(
        msg.chat.id,
        "🫂 *Помощь по боту*\n\n\
        /start – начать работу\n\
        /cancel – отменить текущее действие\n\n\
        *Как записаться:*\n\
        1\\. Нажмите «Записаться на пробный урок»\n\
        2\\. Ответьте на вопросы: имя, контакт, дата, пожелания\n\
        3\\. Пришлите скриншот оплаты одним фото\n\n\
        Разделы меню расскажут о студии, преподавателях и расписании\\.",
    )
    .parse_mode(ParseMode::MarkdownV2)
    .await?;

    Ok(())
}

/// Discards whatever the bot was waiting for, unconditionally.
async fn handle_cancel(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    state.clear_intent(msg.chat.id).await;

    bot.send_message(msg.chat.id, "✅ Действие отменено. Вы в главном меню.")
        .reply_markup(main_menu_keyboard())
        .await?;

    Ok(())
}

async fn handle_admin(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let from = msg.from.as_ref().map(|user| user.id);
    if !state.config.is_admin(from, msg.chat.id) {
        // Silent deny: logged for audit, nothing exposed to the requester.
        log::warn!("🔒 Unauthorized /admin from {:?} in chat {}", from, msg.chat.id);
        return Ok(());
    }

    bot.send_message(msg.chat.id, "🛠 Панель администратора")
        .reply_markup(admin_panel_keyboard())
        .await?;

    Ok(())
}
