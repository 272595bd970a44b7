//! Shared fakes and builders for the test modules

use crate::{
    Error, Result,
    api::{ChatApi, MediaUploader},
    model::{
        ChatRoom, MessageListResponse, MessageType, OutgoingMessage, RoomListResponse, RoomStatus,
        SenderType, ServerMessage,
    },
    sync::{ChatService, ManualClock},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Fixed point in time, offset by `secs`
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

/// Room with a preview and unread count
pub fn create_test_room(
    room_id: i64,
    name: &str,
    last_message: &str,
    at: i64,
    unread: u32,
) -> ChatRoom {
    let mut room = ChatRoom::new(room_id, room_id * 10, name);
    room.status = RoomStatus::Active;
    room.last_message = last_message.to_string();
    room.last_message_at = Some(ts(at));
    room.unread_count = unread;
    room
}

/// Customer message
pub fn create_test_message(message_id: i64, content: &str, at: i64) -> ServerMessage {
    ServerMessage {
        message_id,
        message_content: content.to_string(),
        message_type: MessageType::Text,
        file_url: None,
        sender_type: SenderType::Customer,
        sender_name: "Customer".to_string(),
        created_at: Some(ts(at)),
    }
}

/// `count` customer messages with ids 1..=count, one second apart
pub fn create_history(count: i64) -> Vec<ServerMessage> {
    (1..=count)
        .map(|id| create_test_message(id, &format!("message {}", id), id))
        .collect()
}

/// In-memory backend with call counters and failure switches
///
/// Message history is kept oldest first; page 1 is the newest `limit`
/// messages and is returned newest first, like the real backend.
#[derive(Default)]
pub struct FakeApi {
    rooms: Mutex<Vec<ChatRoom>>,
    history: Mutex<HashMap<i64, Vec<ServerMessage>>>,
    next_message_id: AtomicI64,
    next_sent_at: AtomicI64,
    pub room_calls: AtomicUsize,
    pub message_calls: Mutex<Vec<(i64, u32)>>,
    pub sent: Mutex<Vec<(i64, OutgoingMessage)>>,
    pub mark_read_calls: Mutex<Vec<i64>>,
    pub assign_calls: Mutex<Vec<i64>>,
    pub status_calls: Mutex<Vec<(i64, RoomStatus)>>,
    pub fail_rooms: AtomicBool,
    pub fail_messages: AtomicBool,
    pub fail_send: AtomicBool,
    pub fail_mark_read: AtomicBool,
    older_page_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        let api = Self::default();
        api.next_message_id.store(1000, Ordering::SeqCst);
        api.next_sent_at.store(10_000, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn with_rooms(rooms: Vec<ChatRoom>) -> Arc<Self> {
        let api = Self::new();
        api.set_rooms(rooms);
        api
    }

    pub fn set_rooms(&self, rooms: Vec<ChatRoom>) {
        *self.rooms.lock().expect("rooms lock") = rooms;
    }

    pub fn server_rooms(&self) -> Vec<ChatRoom> {
        self.rooms.lock().expect("rooms lock").clone()
    }

    /// Change one room on the server side
    pub fn update_room(&self, room_id: i64, update: impl FnOnce(&mut ChatRoom)) {
        let mut rooms = self.rooms.lock().expect("rooms lock");
        if let Some(room) = rooms.iter_mut().find(|r| r.room_id == room_id) {
            update(room);
        }
    }

    pub fn set_history(&self, room_id: i64, messages: Vec<ServerMessage>) {
        self.history
            .lock()
            .expect("history lock")
            .insert(room_id, messages);
    }

    /// Append a message as if the customer had sent it
    pub fn push_message(&self, room_id: i64, message: ServerMessage) {
        self.history
            .lock()
            .expect("history lock")
            .entry(room_id)
            .or_default()
            .push(message);
    }

    /// Make requests for pages after the first wait for the returned gate
    pub fn gate_older_pages(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.older_page_gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }

    pub fn room_call_count(&self) -> usize {
        self.room_calls.load(Ordering::SeqCst)
    }

    pub fn message_calls_for_page(&self, page: u32) -> usize {
        self.message_calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(_, p)| *p == page)
            .count()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("sent lock").len()
    }

    fn unavailable() -> Error {
        Error::Transport("backend unavailable".to_string())
    }
}

#[async_trait]
impl ChatApi for FakeApi {
    async fn list_rooms(&self, _page: u32, _limit: u32, _fresh: bool) -> Result<RoomListResponse> {
        self.room_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_rooms.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(RoomListResponse::from_rooms(self.server_rooms()))
    }

    async fn list_messages(
        &self,
        room_id: i64,
        page: u32,
        limit: u32,
        _fresh: bool,
    ) -> Result<MessageListResponse> {
        self.message_calls
            .lock()
            .expect("calls lock")
            .push((room_id, page));

        if page >= 2 {
            let gate = self.older_page_gate.lock().expect("gate lock").clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
        }

        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let history = self
            .history
            .lock()
            .expect("history lock")
            .get(&room_id)
            .cloned()
            .unwrap_or_default();

        let limit = limit as usize;
        let skip = (page.saturating_sub(1) as usize) * limit;
        let messages = history.into_iter().rev().skip(skip).take(limit).collect();
        Ok(MessageListResponse { messages })
    }

    async fn send_message(&self, room_id: i64, message: &OutgoingMessage) -> Result<ServerMessage> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                message: "send rejected".to_string(),
            });
        }

        let confirmed = ServerMessage {
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
            message_content: message.content().to_string(),
            message_type: message.message_type(),
            file_url: message.file_url().map(str::to_string),
            sender_type: SenderType::Admin,
            sender_name: "Dr. Admin".to_string(),
            created_at: Some(ts(self.next_sent_at.fetch_add(1, Ordering::SeqCst))),
        };

        self.sent
            .lock()
            .expect("sent lock")
            .push((room_id, message.clone()));
        self.push_message(room_id, confirmed.clone());

        // Server-side preview matches the client's truncation
        let preview = message.preview();
        let at = confirmed.created_at;
        self.update_room(room_id, |room| {
            room.last_message = preview;
            room.last_message_at = at;
            room.unread_count = 0;
        });

        Ok(confirmed)
    }

    async fn assign_room(&self, room_id: i64) -> Result<()> {
        self.assign_calls.lock().expect("assign lock").push(room_id);
        self.update_room(room_id, |room| room.status = RoomStatus::Active);
        Ok(())
    }

    async fn update_status(&self, room_id: i64, status: RoomStatus) -> Result<()> {
        self.status_calls
            .lock()
            .expect("status lock")
            .push((room_id, status));
        self.update_room(room_id, |room| room.status = status);
        Ok(())
    }

    async fn mark_read(&self, room_id: i64) -> Result<()> {
        self.mark_read_calls.lock().expect("read lock").push(room_id);
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                message: "read receipt failed".to_string(),
            });
        }
        self.update_room(room_id, |room| room.unread_count = 0);
        Ok(())
    }
}

/// Uploader that returns a CDN URL, or fails when asked to
pub struct FakeUploader {
    pub fail: bool,
}

#[async_trait]
impl MediaUploader for FakeUploader {
    async fn upload(&self, file_name: &str, _bytes: Vec<u8>) -> Result<String> {
        if self.fail {
            return Err(Error::Upload("storage unavailable".to_string()));
        }
        Ok(format!("https://cdn.test/{}", file_name))
    }
}

/// Service over `api` with a manual clock and a 3 second cache window
pub fn create_test_service(api: Arc<FakeApi>) -> (Arc<ChatService>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let service = Arc::new(ChatService::with_clock(
        api,
        Duration::from_secs(3),
        clock.clone(),
    ));
    (service, clock)
}
