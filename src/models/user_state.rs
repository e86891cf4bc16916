use serde::{Deserialize, Serialize};

use super::BookingSession;

/// The single pending intent for one user. Exactly one variant can be
/// active, so setting a new one supersedes whatever text the previous flow
/// was still waiting for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum UserIntent {
    #[default]
    Idle,
    /// Admin: the next message is the broadcast body.
    AwaitingBroadcast,
    /// Admin: the next text replaces the named content section.
    AwaitingContentEdit(String),
    /// The booking dialogue is in progress.
    InBooking(BookingSession),
}
