//! Room list view model
//!
//! Renders the cached room list and applies incremental updates without a full
//! reload: whole-list replacements pushed by the poller, and single-room
//! patches pushed by an open conversation after the admin sends.

use crate::{
    Result,
    model::{ChatRoom, RoomListResponse, RoomPatch, RoomStatus},
    sync::{ChangeDescriptor, ChatService},
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Incremental update for the room list
#[derive(Debug, Clone, PartialEq)]
pub enum RoomListUpdate {
    /// Server state observed by the poller
    Polled {
        /// Full room list
        response: RoomListResponse,
        /// What changed
        change: ChangeDescriptor,
    },
    /// Change caused by the admin in this session
    Local(RoomPatch),
}

/// Admin's room list
pub struct RoomListView {
    service: Arc<ChatService>,
    page_size: u32,
    rooms: Vec<ChatRoom>,
    filter: Option<RoomStatus>,
    selected: Option<i64>,
    highlighted: HashSet<i64>,
    loading: bool,
    last_error: Option<String>,
}

impl RoomListView {
    /// Create an empty view
    pub fn new(service: Arc<ChatService>, page_size: u32) -> Self {
        Self {
            service,
            page_size,
            rooms: Vec::new(),
            filter: None,
            selected: None,
            highlighted: HashSet::new(),
            loading: false,
            last_error: None,
        }
    }

    /// Load the first page, from cache unless `force_refresh`
    ///
    /// On failure the current rooms are kept and the error is recorded.
    pub async fn load(&mut self, force_refresh: bool) -> Result<()> {
        self.loading = true;
        let result = self.service.list_rooms(1, self.page_size, force_refresh).await;
        self.loading = false;

        match result {
            Ok(response) => {
                self.replace_rooms(response.rooms);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load rooms: {}", e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Manual refresh: drop the cache and fetch
    pub async fn refresh(&mut self) -> Result<()> {
        self.service.clear_cache().await;
        self.load(true).await
    }

    /// Apply a poller or local update in place
    pub fn apply_update(&mut self, update: RoomListUpdate) {
        match update {
            RoomListUpdate::Polled { response, change } => {
                debug!(
                    "Room list updated by poll ({} rooms, {:?})",
                    response.rooms.len(),
                    change.update_type
                );
                self.replace_rooms(response.rooms);
                self.highlighted = change.changed_rooms.into_iter().collect();
            }
            RoomListUpdate::Local(patch) => {
                let Some(index) = self.rooms.iter().position(|r| r.room_id == patch.room_id)
                else {
                    return;
                };
                self.rooms[index].apply_patch(&patch);
                self.highlighted.remove(&patch.room_id);
                if patch.move_to_front && index > 0 {
                    let room = self.rooms.remove(index);
                    self.rooms.insert(0, room);
                }
            }
        }
    }

    fn replace_rooms(&mut self, rooms: Vec<ChatRoom>) {
        self.rooms = rooms;
        self.ensure_selection();
    }

    /// Keep the selection on a visible room, if any
    fn ensure_selection(&mut self) {
        let visible: Vec<i64> = self.visible_rooms().iter().map(|r| r.room_id).collect();
        let still_visible = self.selected.is_some_and(|id| visible.contains(&id));
        if !still_visible {
            self.selected = visible.first().copied();
        }
    }

    /// All rooms, most recent first
    pub fn rooms(&self) -> &[ChatRoom] {
        &self.rooms
    }

    /// Rooms passing the status filter
    pub fn visible_rooms(&self) -> Vec<&ChatRoom> {
        self.rooms
            .iter()
            .filter(|room| self.filter.is_none_or(|status| room.status == status))
            .collect()
    }

    /// Current status filter
    pub fn filter(&self) -> Option<RoomStatus> {
        self.filter
    }

    /// Set the status filter
    pub fn set_filter(&mut self, filter: Option<RoomStatus>) {
        self.filter = filter;
        self.ensure_selection();
    }

    /// Cycle all -> pending -> active -> completed -> cancelled -> all
    pub fn cycle_filter(&mut self) {
        let statuses = RoomStatus::all();
        let next = match self.filter {
            None => Some(statuses[0]),
            Some(current) => statuses
                .iter()
                .position(|s| *s == current)
                .and_then(|i| statuses.get(i + 1))
                .copied(),
        };
        self.set_filter(next);
    }

    /// Selected room id
    pub fn selected_id(&self) -> Option<i64> {
        self.selected
    }

    /// Selected room
    pub fn selected_room(&self) -> Option<&ChatRoom> {
        let id = self.selected?;
        self.rooms.iter().find(|room| room.room_id == id)
    }

    /// Select a room by id
    pub fn select(&mut self, room_id: i64) {
        if self.rooms.iter().any(|room| room.room_id == room_id) {
            self.selected = Some(room_id);
        }
    }

    /// Move the selection down
    pub fn select_next(&mut self) {
        self.move_selection(1);
    }

    /// Move the selection up
    pub fn select_previous(&mut self) {
        self.move_selection(-1);
    }

    fn move_selection(&mut self, step: isize) {
        let visible: Vec<i64> = self.visible_rooms().iter().map(|r| r.room_id).collect();
        if visible.is_empty() {
            self.selected = None;
            return;
        }

        let current = self
            .selected
            .and_then(|id| visible.iter().position(|v| *v == id))
            .unwrap_or(0) as isize;
        let len = visible.len() as isize;
        let next = (current + step).rem_euclid(len) as usize;
        self.selected = Some(visible[next]);
    }

    /// Whether a room changed in the last external update
    pub fn is_highlighted(&self, room_id: i64) -> bool {
        self.highlighted.contains(&room_id)
    }

    /// Sum of unread counts over all rooms
    pub fn total_unread(&self) -> u32 {
        self.rooms.iter().map(|room| room.unread_count).sum()
    }

    /// Whether a load is in progress
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last load error
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Claim the selected room, then refresh
    pub async fn assign_selected(&mut self) -> Result<()> {
        let Some(room_id) = self.selected else {
            return Ok(());
        };
        self.service.assign_room(room_id).await?;
        self.refresh().await
    }

    /// Set the selected room's status, then refresh
    pub async fn set_selected_status(&mut self, status: RoomStatus) -> Result<()> {
        let Some(room_id) = self.selected else {
            return Ok(());
        };
        self.service.update_status(room_id, status).await?;
        self.refresh().await
    }
}
