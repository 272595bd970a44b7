//! Backend API seam
//!
//! This module defines the collaborators the sync core talks to:
//! - `ChatApi` - REST chat endpoints (rooms, messages, assignment, status, read)
//! - `MediaUploader` - direct-to-storage media upload returning a public URL
//!
//! `HttpChatApi` is the production implementation over HTTP.

mod http;

pub use http::HttpChatApi;

use crate::{
    Result,
    model::{MessageListResponse, OutgoingMessage, RoomListResponse, RoomStatus, ServerMessage},
};
use async_trait::async_trait;

/// REST chat endpoints used by the admin console
///
/// `fresh` asks the transport to bypass any intermediate HTTP cache.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET rooms(page, limit)`
    async fn list_rooms(&self, page: u32, limit: u32, fresh: bool) -> Result<RoomListResponse>;

    /// `GET messages(roomId, page, limit)`
    async fn list_messages(
        &self,
        room_id: i64,
        page: u32,
        limit: u32,
        fresh: bool,
    ) -> Result<MessageListResponse>;

    /// `POST message(roomId, content, type, fileUrl)`, returning the confirmed echo
    async fn send_message(&self, room_id: i64, message: &OutgoingMessage) -> Result<ServerMessage>;

    /// `POST assign(roomId)`
    async fn assign_room(&self, room_id: i64) -> Result<()>;

    /// `PATCH status(roomId, status)`
    async fn update_status(&self, room_id: i64, status: RoomStatus) -> Result<()>;

    /// `POST markRead(roomId)`
    async fn mark_read(&self, room_id: i64) -> Result<()>;
}

/// Uploads a media file and returns its public URL
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload `bytes` under `file_name`
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String>;
}
