//! Display formatting for chat timestamps and message previews

use crate::model::message::MessageType;
use chrono::{DateTime, Datelike, Local, TimeZone, Utc};

/// Maximum preview length in UTF-16 code units before truncation
pub const PREVIEW_MAX_UNITS: usize = 100;

/// Placeholder content for image messages
pub const IMAGE_PLACEHOLDER: &str = "[Image]";

/// Placeholder content for video messages
pub const VIDEO_PLACEHOLDER: &str = "[Video]";

/// Truncate message content into a room list preview
///
/// Length is counted in UTF-16 code units, as the backend counts it. Content
/// of at most 100 units is returned unchanged; longer content is cut to 100
/// units followed by `...`. A character straddling the limit is dropped whole.
pub fn truncate_preview(content: &str) -> String {
    let mut units = 0;
    for (byte_idx, ch) in content.char_indices() {
        units += ch.len_utf16();
        if units > PREVIEW_MAX_UNITS {
            return format!("{}...", &content[..byte_idx]);
        }
    }
    content.to_string()
}

/// Preview text for a message of the given type
pub fn preview_for(content: &str, message_type: MessageType) -> String {
    match message_type {
        MessageType::Text => truncate_preview(content),
        MessageType::Image => IMAGE_PLACEHOLDER.to_string(),
        MessageType::Video => VIDEO_PLACEHOLDER.to_string(),
    }
}

/// Room list timestamp in the local timezone
pub fn room_timestamp(ts: DateTime<Utc>) -> String {
    room_timestamp_in(ts, Utc::now(), &Local)
}

/// Conversation timestamp in the local timezone
pub fn message_timestamp(ts: DateTime<Utc>) -> String {
    message_timestamp_in(ts, Utc::now(), &Local)
}

/// Room list timestamp relative to `now`, rendered in `tz`
///
/// `HH:MM` today, `DD/MM HH:MM` earlier this year, `DD/MM/YYYY` otherwise.
pub fn room_timestamp_in<Tz: TimeZone>(ts: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let ts = ts.with_timezone(tz);
    let now = now.with_timezone(tz);

    if ts.date_naive() == now.date_naive() {
        ts.format("%H:%M").to_string()
    } else if ts.year() == now.year() {
        ts.format("%d/%m %H:%M").to_string()
    } else {
        ts.format("%d/%m/%Y").to_string()
    }
}

/// Conversation timestamp relative to `now`, rendered in `tz`
///
/// `HH:MM` today, `DD/MM/YYYY HH:MM` otherwise.
pub fn message_timestamp_in<Tz: TimeZone>(
    ts: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let ts = ts.with_timezone(tz);
    let now = now.with_timezone(tz);

    if ts.date_naive() == now.date_naive() {
        ts.format("%H:%M").to_string()
    } else {
        ts.format("%d/%m/%Y %H:%M").to_string()
    }
}
