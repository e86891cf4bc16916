pub mod broadcast;
pub mod callbacks;
pub mod commands;
pub mod messages;
pub mod utils;

pub use callbacks::callback_handler;
pub use commands::command_handler;
pub use messages::message_handler;

use chrono::Utc;
use tokio::time;

use crate::bot_state::BotState;

/// Hourly sweep over finalized bookings whose lesson time has passed the
/// retention window. In-progress dialogues are never touched.
pub async fn booking_cleanup_task(state: BotState) {
    let mut interval = time::interval(time::Duration::from_secs(3600));

    loop {
        interval.tick().await;

        match state
            .db
            .cleanup_expired_bookings(Utc::now().naive_utc(), state.config.retention_days)
            .await
        {
            Ok(0) => {}
            Ok(removed) => log::info!("🧹 Removed {} expired bookings", removed),
            Err(e) => log::error!("Error cleaning up bookings: {}", e),
        }
    }
}
