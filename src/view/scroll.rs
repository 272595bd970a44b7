//! Row-based scroll model for message panes
//!
//! Positions are measured in rows from the top of the content. Message heights
//! come from a `Layout`, so the same model serves a terminal (rows of text) or
//! any other renderer that can measure a message.

use crate::model::ChatMessage;

/// Measures how many rows a message occupies
pub trait Layout: Send + Sync {
    /// Height of one message in rows
    fn message_height(&self, message: &ChatMessage) -> u32;

    /// Total height of a message list
    fn content_height(&self, messages: &[ChatMessage]) -> u32 {
        messages.iter().map(|m| self.message_height(m)).sum()
    }
}

/// One header row plus the content wrapped at a fixed width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedLayout {
    /// Available text width in columns
    pub width: u16,
}

impl WrappedLayout {
    /// Create a layout for the given width (at least one column)
    pub fn new(width: u16) -> Self {
        Self {
            width: width.max(1),
        }
    }
}

impl Default for WrappedLayout {
    fn default() -> Self {
        Self::new(80)
    }
}

impl Layout for WrappedLayout {
    fn message_height(&self, message: &ChatMessage) -> u32 {
        let width = u32::from(self.width.max(1));
        let body: u32 = message
            .content()
            .lines()
            .map(|line| {
                let chars = line.chars().count() as u32;
                chars.div_ceil(width).max(1)
            })
            .sum();
        1 + body.max(1)
    }
}

/// Scroll position over a content extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollState {
    /// First visible row
    pub offset: u32,
    /// Total content rows
    pub content_height: u32,
    /// Visible rows
    pub viewport_height: u32,
}

impl ScrollState {
    /// Largest valid offset
    pub fn max_offset(&self) -> u32 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    /// Rows between the bottom of the viewport and the end of the content
    pub fn distance_from_bottom(&self) -> u32 {
        self.max_offset().saturating_sub(self.offset)
    }

    /// Whether the viewport is within `threshold` rows of the bottom
    pub fn is_near_bottom(&self, threshold: u32) -> bool {
        self.distance_from_bottom() <= threshold
    }

    /// Whether the viewport is within `threshold` rows of the top
    pub fn is_near_top(&self, threshold: u32) -> bool {
        self.offset <= threshold
    }

    /// Jump to the end of the content
    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// Move to an absolute offset, clamped to the content
    pub fn scroll_to(&mut self, offset: u32) {
        self.offset = offset.min(self.max_offset());
    }

    /// Move by a signed number of rows, clamped to the content
    pub fn scroll_by(&mut self, delta: i64) {
        let target = (i64::from(self.offset) + delta).max(0);
        self.scroll_to(u32::try_from(target).unwrap_or(u32::MAX));
    }

    /// Record a new content extent, keeping the offset in range
    pub fn set_content_height(&mut self, height: u32) {
        self.content_height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Record a new viewport size, keeping the offset in range
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Account for rows inserted above the viewport
    ///
    /// Shifts the offset by the growth in content height so the rows the user
    /// was looking at stay in place.
    pub fn preserve_after_prepend(&mut self, old_height: u32, new_height: u32) {
        let grown = new_height.saturating_sub(old_height);
        self.content_height = new_height;
        self.offset = (self.offset + grown).min(self.max_offset());
    }
}
