//! View models driven by the sync core
//!
//! - `scroll` - Row-based scroll model and message measurement
//! - `conversation` - Message pane for one open room
//! - `room_list` - Admin room list with incremental updates

pub mod conversation;
pub mod room_list;
pub mod scroll;

pub use conversation::{ConversationSnapshot, ConversationView, SentCallback};
pub use room_list::{RoomListUpdate, RoomListView};
pub use scroll::{Layout, ScrollState, WrappedLayout};
