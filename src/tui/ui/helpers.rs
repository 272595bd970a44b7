//! Helper functions for UI rendering

use crate::model::{ChatMessage, MessageType, RoomStatus};
use ratatui::style::Color;

/// Split text into rows of at most `width` characters
///
/// Every source line yields at least one row, and empty text yields one empty
/// row, so the row count matches `WrappedLayout`.
pub fn wrap_text(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(1));
    let mut rows = Vec::new();

    for line in text.lines() {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            rows.push(String::new());
            continue;
        }
        rows.extend(chars.chunks(width).map(|chunk| chunk.iter().collect::<String>()));
    }

    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

/// Text shown for a message body
pub fn message_body(message: &ChatMessage) -> String {
    match message.message_type() {
        MessageType::Image if message.content().is_empty() => "[Image]".to_string(),
        MessageType::Video if message.content().is_empty() => "[Video]".to_string(),
        _ => message.content().to_string(),
    }
}

/// Color used for a room status badge
pub fn status_color(status: RoomStatus) -> Color {
    match status {
        RoomStatus::Pending => Color::Yellow,
        RoomStatus::Active => Color::Green,
        RoomStatus::Completed => Color::DarkGray,
        RoomStatus::Cancelled => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_splits_long_lines() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
    }

    #[test]
    fn test_wrap_text_keeps_one_row_for_empty_text() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }
}
