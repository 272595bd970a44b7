//! TUI types and enums

use crate::view::RoomListUpdate;

/// Screen shown by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Room list with filter and selection
    RoomList,
    /// One open conversation
    Conversation,
}

/// Event delivered to the UI thread from background tasks
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Room list update from the poller or an open conversation
    RoomList(RoomListUpdate),
    /// Message for the status bar
    Status(String),
}
