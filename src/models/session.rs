use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;

/// Current position in the linear booking dialogue. There is no branching
/// except /cancel, which discards the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStep {
    FullName,
    Contact,
    Date,
    Notes,
    Payment,
}

/// In-flight trial-lesson request for one user. Lives only in process
/// memory; a restart loses unfinished dialogues, finalized bookings are
/// already durable by then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSession {
    pub chat_id: ChatId,
    pub step: BookingStep,
    pub full_name: Option<String>,
    pub contact: Option<String>,
    pub preferred_date: Option<String>,
    pub notes: Option<String>,
    /// Set once the booking is persisted at the notes step.
    pub booking_id: Option<i64>,
}

/// What the router should do after feeding one text input to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    AskContact,
    AskDate,
    AskNotes,
    /// Malformed date: session unchanged, re-prompt.
    InvalidDate,
    /// Every field collected — persist the booking now, then await payment.
    Finalize,
    /// Text arrived while a payment photo is expected.
    RepeatPhoto,
}

impl BookingSession {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            step: BookingStep::FullName,
            full_name: None,
            contact: None,
            preferred_date: None,
            notes: None,
            booking_id: None,
        }
    }

    /// Advances the dialogue by one text input. Durable writes happen in the
    /// handler: `Finalize` means the booking must be inserted before the
    /// payment step starts.
    pub fn apply_text(&mut self, text: &str) -> StepOutcome {
        match self.step {
            BookingStep::FullName => {
                self.full_name = Some(text.trim().to_string());
                self.step = BookingStep::Contact;
                StepOutcome::AskContact
            }
            BookingStep::Contact => {
                self.contact = Some(text.trim().to_string());
                self.step = BookingStep::Date;
                StepOutcome::AskDate
            }
            BookingStep::Date => {
                if parse_lesson_time(text).is_none() {
                    return StepOutcome::InvalidDate;
                }
                self.preferred_date = Some(text.trim().to_string());
                self.step = BookingStep::Notes;
                StepOutcome::AskNotes
            }
            BookingStep::Notes => {
                self.notes = normalize_notes(text);
                self.step = BookingStep::Payment;
                StepOutcome::Finalize
            }
            BookingStep::Payment => StepOutcome::RepeatPhoto,
        }
    }
}

/// Strict `ДД.ММ.ГГГГ` parse, optionally with `ЧЧ:ММ`. Anything else is
/// rejected so that ambiguous international formats never slip through.
pub fn parse_lesson_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%d.%m.%Y %H:%M") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%d.%m.%Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Dash and "no"-style answers mean the user has no notes.
pub fn normalize_notes(text: &str) -> Option<String> {
    let text = text.trim();
    let lowered = text.to_lowercase();
    let empty = text.is_empty()
        || text == "-"
        || text == "—"
        || lowered == "no"
        || lowered == "none"
        || lowered == "нет";
    if empty {
        None
    } else {
        Some(text.to_string())
    }
}

/// Date prompt for the dialogue; offers the previously booked time when the
/// user already has one on record.
pub fn date_prompt(previous: Option<NaiveDateTime>) -> String {
    match previous {
        Some(prev) => format!(
            "📅 На какую дату записать занятие?\n\
             Формат: ДД.ММ.ГГГГ, например 15.06.2024\n\n\
             В прошлый раз вы занимались {} — можно отправить это время снова.",
            prev.format("%d.%m.%Y %H:%M")
        ),
        None => "📅 На какую дату записать занятие?\n\
                 Формат: ДД.ММ.ГГГГ, например 15.06.2024"
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> BookingSession {
        BookingSession::new(ChatId(1))
    }

    #[test]
    fn walks_all_steps_in_order() {
        let mut s = session();
        assert_eq!(s.apply_text("Алиса Иванова"), StepOutcome::AskContact);
        assert_eq!(s.apply_text("+79990001122"), StepOutcome::AskDate);
        assert_eq!(s.apply_text("15.06.2024"), StepOutcome::AskNotes);
        assert_eq!(s.apply_text("хочу английский"), StepOutcome::Finalize);

        assert_eq!(s.step, BookingStep::Payment);
        assert_eq!(s.full_name.as_deref(), Some("Алиса Иванова"));
        assert_eq!(s.contact.as_deref(), Some("+79990001122"));
        assert_eq!(s.preferred_date.as_deref(), Some("15.06.2024"));
        assert_eq!(s.notes.as_deref(), Some("хочу английский"));
    }

    #[test]
    fn malformed_date_is_rejected_without_state_change() {
        let mut s = session();
        s.apply_text("Алиса");
        s.apply_text("+7000");

        // 31st of February does not exist; repeated rejection is idempotent.
        assert_eq!(s.apply_text("31.02.2024"), StepOutcome::InvalidDate);
        assert_eq!(s.apply_text("31.02.2024"), StepOutcome::InvalidDate);
        assert_eq!(s.apply_text("2024-06-15"), StepOutcome::InvalidDate);
        assert_eq!(s.step, BookingStep::Date);
        assert!(s.preferred_date.is_none());

        assert_eq!(s.apply_text("15.06.2024"), StepOutcome::AskNotes);
    }

    #[test]
    fn date_with_time_is_accepted() {
        let mut s = session();
        s.apply_text("Алиса");
        s.apply_text("+7000");
        assert_eq!(s.apply_text("15.06.2024 18:30"), StepOutcome::AskNotes);
    }

    #[test]
    fn empty_note_markers_become_none() {
        for marker in ["-", "—", "no", "None", "нет", "  "] {
            assert_eq!(normalize_notes(marker), None, "marker {:?}", marker);
        }
        assert_eq!(normalize_notes(" утро "), Some("утро".to_string()));
    }

    #[test]
    fn text_during_payment_step_reprompts_for_photo() {
        let mut s = session();
        s.apply_text("Алиса");
        s.apply_text("+7000");
        s.apply_text("15.06.2024");
        s.apply_text("-");
        assert_eq!(s.notes, None);
        assert_eq!(s.apply_text("вот оплата"), StepOutcome::RepeatPhoto);
        assert_eq!(s.step, BookingStep::Payment);
    }

    #[test]
    fn parse_lesson_time_formats() {
        assert!(parse_lesson_time("15.06.2024").is_some());
        assert!(parse_lesson_time(" 15.06.2024 18:30 ").is_some());
        assert!(parse_lesson_time("31.02.2024").is_none());
        assert!(parse_lesson_time("15/06/2024").is_none());
        assert!(parse_lesson_time("завтра").is_none());
    }

    #[test]
    fn date_prompt_offers_reuse_only_with_history() {
        let generic = date_prompt(None);
        assert!(!generic.contains("прошлый раз"), "{}", generic);

        let prev = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        let reuse = date_prompt(Some(prev));
        assert!(reuse.contains("15.06.2024 18:30"), "{}", reuse);
    }
}
