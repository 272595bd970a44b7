//! Chat domain model
//!
//! Canonical types for rooms and messages, normalized once at the
//! deserialization boundary:
//! - `room` - Chat rooms, room status, room list responses and patches
//! - `message` - Server messages, optimistic (pending) messages and identifiers
//! - `settings` - Application settings and derived runtime configuration
//! - `format` - Display formatting for timestamps and previews
//! - `wire` - Serde helpers for tolerant server payload decoding

pub mod format;
pub mod message;
pub mod room;
pub mod settings;
pub mod wire;

pub use message::{
    ChatMessage, MediaKind, MessageId, MessageListResponse, MessageType, OutgoingMessage,
    PendingMessage, SenderType, ServerMessage,
};
pub use room::{ChatRoom, Pagination, RoomListResponse, RoomPatch, RoomStatus};
pub use settings::{ConversationConfig, PollingConfig, Settings};
