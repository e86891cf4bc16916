use std::collections::HashSet;

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};

use crate::models::Booking;

pub const BTN_BOOK: &str = "📝 Записаться на пробный урок";
pub const BTN_ABOUT: &str = "ℹ️ О студии";
pub const BTN_TEACHERS: &str = "👩‍🏫 Преподаватели";
pub const BTN_SCHEDULE: &str = "📅 Расписание";
pub const BTN_CONTACTS: &str = "📞 Контакты";

pub const GENERIC_FAILURE: &str = "⚠️ Что-то пошло не так. Попробуйте ещё раз.";

/// Экранирование MarkdownV2
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Главное меню
pub fn main_menu_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new(vec![
            vec![KeyboardButton::new(BTN_BOOK)],
            vec![
                KeyboardButton::new(BTN_ABOUT),
                KeyboardButton::new(BTN_TEACHERS),
            ],
            vec![
                KeyboardButton::new(BTN_SCHEDULE),
                KeyboardButton::new(BTN_CONTACTS),
            ],
        ])
        .resize_keyboard(),
    )
}

/// Панель администратора
pub fn admin_panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📢 Рассылка", "admin_broadcast")],
        vec![InlineKeyboardButton::callback("📬 Заявки", "admin_bookings")],
        vec![
            InlineKeyboardButton::callback("✏️ О студии", "edit_about"),
            InlineKeyboardButton::callback("✏️ Преподаватели", "edit_teachers"),
        ],
        vec![
            InlineKeyboardButton::callback("✏️ Расписание", "edit_schedule"),
            InlineKeyboardButton::callback("✏️ Контакты", "edit_contacts"),
        ],
    ])
}

pub fn section_title(key: &str) -> &str {
    match key {
        "about" => "О студии",
        "teachers" => "Преподаватели",
        "schedule" => "Расписание",
        "contacts" => "Контакты",
        _ => key,
    }
}

/// Сводка заявок для администратора (MarkdownV2)
pub fn format_bookings_overview(bookings: &[Booking], paid: &HashSet<i64>) -> String {
    if bookings.is_empty() {
        return "📬 *Заявки*\n\nПока нет ни одной заявки\\.".to_string();
    }

    let mut text = String::from("📬 *Заявки* \\(новые сверху\\)\n");
    for booking in bookings {
        let status = if paid.contains(&booking.id) {
            "💳 оплачена"
        } else {
            "⏳ без оплаты"
        };
        text.push_str(&format!(
            "\n\\#{} *{}*\n{} {}\n{}\n",
            booking.id,
            escape_markdown_v2(&booking.full_name),
            escape_markdown_v2(&booking.contact),
            escape_markdown_v2(&booking.preferred_date),
            status
        ));
        if let Some(notes) = &booking.notes {
            text.push_str(&format!("💬 {}\n", escape_markdown_v2(notes)));
        }
    }
    text
}
