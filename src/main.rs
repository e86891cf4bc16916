use teloxide::{prelude::*, utils::command::BotCommands};

mod bot_state;
mod config;
mod content;
mod database;
mod handlers;
mod models;

use crate::bot_state::BotState;
use crate::config::Config;
use crate::content::ContentRegistry;
use crate::database::Database;
use crate::handlers::{callback_handler, command_handler, message_handler};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "показать помощь")]
    Help,
    #[command(description = "отменить текущее действие")]
    Cancel,
    #[command(description = "панель администратора")]
    Admin,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting language studio bot...");

    // Missing BOT_TOKEN is fatal: the process must not start without it.
    let config = Config::from_env()?;

    let db = Database::new(&config.database_path).await?;
    db.init().await?;
    log::info!("✅ Database ready at {}", config.database_path.display());

    let content = ContentRegistry::new(db.clone()).await?;

    let bot = Bot::new(config.token.clone());
    let state = BotState::new(db, content, config);

    // Background sweep for bookings past the retention window.
    let state_clone = state.clone();
    tokio::spawn(async move {
        handlers::booking_cleanup_task(state_clone).await;
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
