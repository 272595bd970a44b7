//! Chat rooms and room list payloads

use crate::model::{format, wire};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a chat room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum RoomStatus {
    /// Waiting for an admin to pick it up
    #[default]
    Pending = 0,
    /// Claimed by an admin
    Active = 1,
    /// Conversation finished
    Completed = 2,
    /// Conversation cancelled
    Cancelled = 3,
}

impl From<i64> for RoomStatus {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Active,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl From<RoomStatus> for i64 {
    fn from(status: RoomStatus) -> Self {
        status as i64
    }
}

impl RoomStatus {
    /// Get all statuses in display order
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::Active, Self::Completed, Self::Cancelled]
    }

    /// Get display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// A customer-admin conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    /// Server-assigned room identifier
    #[serde(alias = "RoomId")]
    pub room_id: i64,
    /// Customer who opened the room
    #[serde(default, alias = "CustomerId", deserialize_with = "wire::nullable")]
    pub customer_id: i64,
    /// Customer display name
    #[serde(default, alias = "CustomerName", deserialize_with = "wire::nullable")]
    pub customer_name: String,
    /// Room status
    #[serde(default, alias = "Status", deserialize_with = "wire::nullable")]
    pub status: RoomStatus,
    /// Preview of the latest message
    #[serde(default, alias = "LastMessage", deserialize_with = "wire::nullable")]
    pub last_message: String,
    /// Raw timestamp of the latest message
    #[serde(default, alias = "LastMessageAt", deserialize_with = "wire::timestamp")]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Display-formatted `last_message_at`, filled in by the data-access layer
    #[serde(skip)]
    pub last_message_display: String,
    /// Messages the admin has not read yet
    #[serde(default, alias = "UnreadCount", deserialize_with = "wire::nullable")]
    pub unread_count: u32,
    /// Room creation time
    #[serde(default, alias = "CreatedAt", deserialize_with = "wire::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatRoom {
    /// Create a room with the given id and customer, everything else empty
    pub fn new(room_id: i64, customer_id: i64, customer_name: impl Into<String>) -> Self {
        Self {
            room_id,
            customer_id,
            customer_name: customer_name.into(),
            status: RoomStatus::Pending,
            last_message: String::new(),
            last_message_at: None,
            last_message_display: String::new(),
            unread_count: 0,
            created_at: None,
        }
    }

    /// Recompute `last_message_display` from the raw timestamp
    pub fn refresh_display(&mut self) {
        self.last_message_display = self
            .last_message_at
            .map(format::room_timestamp)
            .unwrap_or_default();
    }

    /// Merge the fields set in `patch` into this room
    pub fn apply_patch(&mut self, patch: &RoomPatch) {
        if let Some(last_message) = &patch.last_message {
            self.last_message = last_message.clone();
        }
        if let Some(at) = patch.last_message_at {
            self.last_message_at = Some(at);
            self.refresh_display();
        }
        if let Some(unread) = patch.unread_count {
            self.unread_count = unread;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// Pagination block of a room list response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page (1-based)
    #[serde(default, alias = "Page", deserialize_with = "wire::nullable")]
    pub page: u32,
    /// Page size
    #[serde(default, alias = "Limit", deserialize_with = "wire::nullable")]
    pub limit: u32,
    /// Total number of rooms
    #[serde(default, alias = "Total", deserialize_with = "wire::nullable")]
    pub total: u32,
    /// Total number of pages
    #[serde(default, alias = "TotalPages", deserialize_with = "wire::nullable")]
    pub total_pages: u32,
}

/// Room list as returned by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoomListResponse {
    /// Rooms, most recent first
    #[serde(default, alias = "Rooms", deserialize_with = "wire::lenient_list")]
    pub rooms: Vec<ChatRoom>,
    /// Pagination info
    #[serde(default, alias = "Pagination", deserialize_with = "wire::nullable")]
    pub pagination: Pagination,
}

impl RoomListResponse {
    /// Build a response from a list of rooms
    pub fn from_rooms(rooms: Vec<ChatRoom>) -> Self {
        Self {
            rooms,
            pagination: Pagination::default(),
        }
    }

    /// Find a room by id
    pub fn room(&self, room_id: i64) -> Option<&ChatRoom> {
        self.rooms.iter().find(|room| room.room_id == room_id)
    }

    /// Fill in display timestamps for every room
    pub fn refresh_display(&mut self) {
        for room in &mut self.rooms {
            room.refresh_display();
        }
    }

    /// Apply a patch to the matching room
    ///
    /// Returns `false` if the room is not in the list. When the patch asks for
    /// it, the room is moved to the front of the list.
    pub fn patch_room(&mut self, patch: &RoomPatch) -> bool {
        let Some(index) = self.rooms.iter().position(|r| r.room_id == patch.room_id) else {
            return false;
        };

        self.rooms[index].apply_patch(patch);
        if patch.move_to_front && index > 0 {
            let room = self.rooms.remove(index);
            self.rooms.insert(0, room);
        }
        true
    }
}

/// Partial update of a room, applied optimistically by local actions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomPatch {
    /// Room to patch
    pub room_id: i64,
    /// New preview text
    pub last_message: Option<String>,
    /// New latest-message timestamp
    pub last_message_at: Option<DateTime<Utc>>,
    /// New unread count
    pub unread_count: Option<u32>,
    /// New status
    pub status: Option<RoomStatus>,
    /// Move the room to the front of the list
    pub move_to_front: bool,
}

impl RoomPatch {
    /// Patch produced by the admin sending a message
    pub fn sent(room_id: i64, preview: String, at: DateTime<Utc>) -> Self {
        Self {
            room_id,
            last_message: Some(preview),
            last_message_at: Some(at),
            unread_count: Some(0),
            status: None,
            move_to_front: true,
        }
    }

    /// Patch produced by the admin reading a room
    pub fn read(room_id: i64) -> Self {
        Self {
            room_id,
            unread_count: Some(0),
            ..Self::default()
        }
    }
}
