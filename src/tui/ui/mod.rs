//! UI rendering module - screen-specific rendering functions

pub mod conversation;
pub mod helpers;
pub mod room_list;

use crate::tui::app::App;
use crate::tui::types::Screen;
use ratatui::Frame;

pub use conversation::render_conversation;
pub use room_list::render_room_list;

/// Main UI rendering function - dispatches to screen-specific render functions
pub fn ui(f: &mut Frame, app: &App) {
    match app.current_screen {
        Screen::RoomList => render_room_list(f, app),
        Screen::Conversation => render_conversation(f, app),
    }
}
