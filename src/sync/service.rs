//! Chat data access
//!
//! `ChatService` is the only component that writes to the room cache. It
//! wraps every chat endpoint and applies optimistic cache patches for the two
//! admin actions whose outcome is known in advance: sending a message and
//! marking a room read.

use crate::{
    Result,
    api::ChatApi,
    model::{
        MessageListResponse, OutgoingMessage, RoomListResponse, RoomPatch, RoomStatus,
        ServerMessage,
    },
    sync::{
        cache::RoomCache,
        clock::{Clock, SystemClock},
    },
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

/// Capacity of the local change channel
const LOCAL_CHANGE_CAPACITY: usize = 64;

/// Data access for rooms and messages
pub struct ChatService {
    /// Backend endpoints
    api: Arc<dyn ChatApi>,
    /// Cached room list
    cache: Mutex<RoomCache>,
    /// Optimistic room patches, for observers that diff against server state
    local_changes: broadcast::Sender<RoomPatch>,
}

impl ChatService {
    /// Create a service with the given cache window and the system clock
    pub fn new(api: Arc<dyn ChatApi>, cache_ttl: Duration) -> Self {
        Self::with_clock(api, cache_ttl, Arc::new(SystemClock))
    }

    /// Create a service with an explicit clock
    pub fn with_clock(api: Arc<dyn ChatApi>, cache_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let (local_changes, _) = broadcast::channel(LOCAL_CHANGE_CAPACITY);
        Self {
            api,
            cache: Mutex::new(RoomCache::new(cache_ttl, clock)),
            local_changes,
        }
    }

    /// List rooms, served from cache when fresh unless `force_refresh`
    ///
    /// Fetched rooms get display timestamps and are stored in the cache.
    /// Transport errors are returned to the caller.
    pub async fn list_rooms(
        &self,
        page: u32,
        limit: u32,
        force_refresh: bool,
    ) -> Result<RoomListResponse> {
        if !force_refresh {
            if let Some(cached) = self.cache.lock().await.get(page, limit) {
                debug!("Room list served from cache (page {})", page);
                return Ok(cached);
            }
        }

        let mut response = self.api.list_rooms(page, limit, force_refresh).await?;
        response.refresh_display();
        debug!("Fetched {} rooms (page {})", response.rooms.len(), page);

        self.cache.lock().await.put(page, limit, response.clone());
        Ok(response)
    }

    /// List one page of messages for a room
    ///
    /// Always goes to the network. Timestamps are left raw; views format them.
    pub async fn list_messages(
        &self,
        room_id: i64,
        page: u32,
        limit: u32,
        force_refresh: bool,
    ) -> Result<MessageListResponse> {
        self.api
            .list_messages(room_id, page, limit, force_refresh)
            .await
    }

    /// Send a message and, on success, patch the cached room
    ///
    /// The cached room gets the truncated preview, the confirmed timestamp and
    /// a zero unread count, and moves to the front of the list.
    pub async fn send_message(
        &self,
        room_id: i64,
        message: &OutgoingMessage,
    ) -> Result<ServerMessage> {
        let confirmed = self.api.send_message(room_id, message).await?;
        info!("Message {} sent to room {}", confirmed.message_id, room_id);

        let sent_at = confirmed.created_at.unwrap_or_else(Utc::now);
        let patch = RoomPatch::sent(room_id, message.preview(), sent_at);
        self.apply_local_patch(patch).await;

        Ok(confirmed)
    }

    /// Claim a pending room for the current admin
    ///
    /// The cache is not patched; callers refresh afterwards.
    pub async fn assign_room(&self, room_id: i64) -> Result<()> {
        self.api.assign_room(room_id).await?;
        info!("Assigned room {}", room_id);
        Ok(())
    }

    /// Change a room's status
    ///
    /// The cache is not patched; callers refresh afterwards.
    pub async fn update_status(&self, room_id: i64, status: RoomStatus) -> Result<()> {
        self.api.update_status(room_id, status).await?;
        info!("Room {} status set to {}", room_id, status.label());
        Ok(())
    }

    /// Mark a room read and zero its cached unread count without reordering
    pub async fn mark_read(&self, room_id: i64) -> Result<()> {
        self.api.mark_read(room_id).await?;
        self.apply_local_patch(RoomPatch::read(room_id)).await;
        Ok(())
    }

    /// Drop the cached room list so the next read hits the network
    pub async fn clear_cache(&self) {
        self.cache.lock().await.invalidate();
        debug!("Room cache cleared");
    }

    /// Subscribe to optimistic patches applied by this service
    pub fn subscribe_local_changes(&self) -> broadcast::Receiver<RoomPatch> {
        self.local_changes.subscribe()
    }

    async fn apply_local_patch(&self, patch: RoomPatch) {
        let patched = self.cache.lock().await.patch_room(&patch);
        if !patched {
            debug!("Room {} not cached, patch kept for observers only", patch.room_id);
        }

        // No receivers is fine
        let _ = self.local_changes.send(patch);
    }
}
