//! Conversation view model for one open room
//!
//! Loads the latest page on open, pages backwards through history while
//! keeping the visible rows in place, merges the latest page on a fast timer
//! and sends messages optimistically.
//!
//! All mutation of the message window happens under one lock together with
//! re-measuring and scroll correction, so a scroll event never observes a
//! list whose extent does not match its offset. Network calls are made with
//! the lock released; results carry the generation they were started under
//! and are dropped if the view has since been reset or closed.

use crate::{
    Error, Result,
    api::MediaUploader,
    model::{
        ChatMessage, ConversationConfig, MediaKind, MessageId, OutgoingMessage, PendingMessage,
        RoomPatch, ServerMessage, message::new_temp_id,
    },
    sync::ChatService,
    view::scroll::{Layout, ScrollState, WrappedLayout},
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Callback told about every message the admin successfully sent
pub type SentCallback = Arc<dyn Fn(RoomPatch) + Send + Sync>;

/// Read-only copy of the view state for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    /// Loaded messages, oldest first
    pub messages: Vec<ChatMessage>,
    /// Scroll position
    pub scroll: ScrollState,
    /// Highest page loaded so far
    pub current_page: u32,
    /// Whether older pages may exist
    pub has_more: bool,
    /// Initial page is loading
    pub loading: bool,
    /// An older page is loading
    pub loading_more: bool,
    /// Draft input
    pub draft: String,
    /// Last error shown to the admin
    pub last_error: Option<String>,
}

struct ConversationState {
    messages: Vec<ChatMessage>,
    current_page: u32,
    has_more: bool,
    is_initial_load: bool,
    loading: bool,
    loading_more: bool,
    latest_id: Option<MessageId>,
    scroll: ScrollState,
    layout: Box<dyn Layout>,
    draft: String,
    is_open: bool,
    generation: u64,
    last_error: Option<String>,
}

impl ConversationState {
    fn new(layout: Box<dyn Layout>) -> Self {
        Self {
            messages: Vec::new(),
            current_page: 0,
            has_more: true,
            is_initial_load: false,
            loading: false,
            loading_more: false,
            latest_id: None,
            scroll: ScrollState::default(),
            layout,
            draft: String::new(),
            is_open: false,
            generation: 0,
            last_error: None,
        }
    }

    /// Clear the window and start a new generation
    fn reset(&mut self) {
        self.messages.clear();
        self.current_page = 0;
        self.has_more = true;
        self.is_initial_load = false;
        self.loading = false;
        self.loading_more = false;
        self.latest_id = None;
        self.scroll.offset = 0;
        self.scroll.content_height = 0;
        self.last_error = None;
        self.generation += 1;
    }

    fn accepts(&self, generation: u64) -> bool {
        self.is_open && self.generation == generation
    }

    fn known_ids(&self) -> HashSet<MessageId> {
        self.messages.iter().map(ChatMessage::id).collect()
    }

    fn measure(&self) -> u32 {
        self.layout.content_height(&self.messages)
    }

    /// Latest confirmed message id
    fn last_confirmed_id(&self) -> Option<MessageId> {
        self.messages
            .iter()
            .rev()
            .find(|m| !m.is_pending())
            .map(ChatMessage::id)
    }

    /// Index of the first pending message in the trailing pending run
    fn pending_tail_start(&self) -> usize {
        self.messages
            .iter()
            .rposition(|m| !m.is_pending())
            .map_or(0, |i| i + 1)
    }

    fn pending_index(&self, temp_id: &str) -> Option<usize> {
        self.messages
            .iter()
            .position(|m| matches!(m, ChatMessage::Pending(p) if p.temp_id == temp_id))
    }
}

/// Sort a fetched page oldest first
fn sort_page(mut page: Vec<ServerMessage>) -> Vec<ServerMessage> {
    page.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.message_id.cmp(&b.message_id))
    });
    page
}

/// Messages from `page` whose ids are not in `known`, oldest first
fn unseen(page: Vec<ServerMessage>, known: &HashSet<MessageId>) -> Vec<ChatMessage> {
    let mut seen = known.clone();
    sort_page(page)
        .into_iter()
        .filter(|m| seen.insert(MessageId::Server(m.message_id)))
        .map(ChatMessage::Confirmed)
        .collect()
}

/// Message pane for one room
pub struct ConversationView {
    room_id: i64,
    service: Arc<ChatService>,
    config: ConversationConfig,
    state: Mutex<ConversationState>,
    live: Mutex<Option<oneshot::Sender<()>>>,
    on_sent: Option<SentCallback>,
}

impl ConversationView {
    /// Create a closed view for a room with the default layout
    pub fn new(room_id: i64, service: Arc<ChatService>, config: ConversationConfig) -> Self {
        Self {
            room_id,
            service,
            config,
            state: Mutex::new(ConversationState::new(Box::new(WrappedLayout::default()))),
            live: Mutex::new(None),
            on_sent: None,
        }
    }

    /// Notify `callback` after each confirmed send
    pub fn with_on_sent(mut self, callback: SentCallback) -> Self {
        self.on_sent = Some(callback);
        self
    }

    /// Room this view shows
    pub fn room_id(&self) -> i64 {
        self.room_id
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = self.lock();
        ConversationSnapshot {
            messages: state.messages.clone(),
            scroll: state.scroll,
            current_page: state.current_page,
            has_more: state.has_more,
            loading: state.loading,
            loading_more: state.loading_more,
            draft: state.draft.clone(),
            last_error: state.last_error.clone(),
        }
    }

    /// Loaded messages, oldest first
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    /// Whether older pages may still exist
    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    /// Whether the view is open
    pub fn is_open(&self) -> bool {
        self.lock().is_open
    }

    /// Open the room: reset, load the latest page and scroll to the bottom
    ///
    /// On failure the view stays open and empty with loading flags cleared,
    /// so `open` can simply be called again. Once the messages are loaded the
    /// room is marked read; returns whether that succeeded. A failed mark-read
    /// is recorded in `last_error`.
    pub async fn open(&self) -> Result<bool> {
        let generation = {
            let mut state = self.lock();
            state.reset();
            state.is_open = true;
            state.loading = true;
            state.is_initial_load = true;
            state.generation
        };

        let result = self
            .service
            .list_messages(self.room_id, 1, self.config.page_size, true)
            .await;

        {
            let mut state = self.lock();
            if !state.accepts(generation) {
                return Err(Error::Closed);
            }
            state.loading = false;

            match result {
                Ok(response) => {
                    let fetched = response.messages.len();
                    state.messages = unseen(response.messages, &HashSet::new());
                    state.current_page = 1;
                    state.has_more = fetched >= self.config.page_size as usize;
                    state.latest_id = state.last_confirmed_id();

                    // Measure after the data lands, then pin to the bottom
                    let height = state.measure();
                    state.scroll.set_content_height(height);
                    state.scroll.scroll_to_bottom();
                    state.is_initial_load = false;
                    debug!(
                        "Opened room {} with {} messages",
                        self.room_id,
                        state.messages.len()
                    );
                }
                Err(e) => {
                    warn!("Failed to load messages for room {}: {}", self.room_id, e);
                    state.is_initial_load = false;
                    state.last_error = Some(e.to_string());
                    return Err(e);
                }
            }
        }

        match self.service.mark_read(self.room_id).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Failed to mark room {} read: {}", self.room_id, e);
                let mut state = self.lock();
                if state.accepts(generation) {
                    state.last_error = Some(format!("Failed to mark as read: {}", e));
                }
                Ok(false)
            }
        }
    }

    /// Close the view and stop live updates
    ///
    /// Requests still in flight complete and their results are ignored.
    pub fn close(&self) {
        self.stop_live_updates();
        let mut state = self.lock();
        state.is_open = false;
        state.generation += 1;
        state.loading = false;
        state.loading_more = false;
    }

    /// Start refreshing the latest page every `poll_interval`
    ///
    /// No-op if already running. The first refresh happens one interval in.
    pub fn start_live_updates(self: &Arc<Self>) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        if live.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.poll_interval;

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                let Some(view) = weak.upgrade() else { break };
                if let Err(e) = view.refresh_latest().await {
                    debug!("Live refresh skipped for room {}: {}", view.room_id, e);
                }
            }
        });

        *live = Some(stop_tx);
    }

    /// Stop the live refresh timer
    pub fn stop_live_updates(&self) {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Fetch the latest page and merge anything new into the tail
    ///
    /// Follows the bottom if the admin was already near it; otherwise the
    /// read position is left alone. Returns how many messages were added.
    pub async fn refresh_latest(&self) -> Result<usize> {
        let generation = {
            let state = self.lock();
            if !state.is_open || state.loading {
                return Ok(0);
            }
            state.generation
        };

        let response = self
            .service
            .list_messages(self.room_id, 1, self.config.page_size, true)
            .await?;

        let mut state = self.lock();
        if !state.accepts(generation) {
            return Ok(0);
        }

        let newest = sort_page(response.messages.clone())
            .last()
            .map(|m| MessageId::Server(m.message_id));
        if newest.is_none() || newest == state.latest_id {
            return Ok(0);
        }

        let was_near_bottom = state.scroll.is_near_bottom(self.config.bottom_threshold);
        let fresh = unseen(response.messages, &state.known_ids());
        let added = fresh.len();

        if added > 0 {
            let at = state.pending_tail_start();
            let pending_tail = state.messages.split_off(at);
            state.messages.extend(fresh);
            state.messages.extend(pending_tail);
            let height = state.measure();
            state.scroll.set_content_height(height);
            if was_near_bottom {
                state.scroll.scroll_to_bottom();
            }
            debug!("Merged {} new messages into room {}", added, self.room_id);
        }

        state.latest_id = newest;
        Ok(added)
    }

    /// Set the visible height in rows
    pub fn set_viewport_height(&self, rows: u32) {
        self.lock().scroll.set_viewport_height(rows);
    }

    /// Replace the layout and re-measure, keeping the bottom pinned if it was
    pub fn set_layout(&self, layout: Box<dyn Layout>) {
        let mut state = self.lock();
        let at_bottom = state.scroll.is_near_bottom(0);
        state.layout = layout;
        let height = state.measure();
        state.scroll.set_content_height(height);
        if at_bottom {
            state.scroll.scroll_to_bottom();
        }
    }

    /// Scroll by a signed number of rows
    pub fn scroll_by(&self, delta: i64) {
        self.lock().scroll.scroll_by(delta);
    }

    /// Scroll to an absolute row
    pub fn scroll_to(&self, offset: u32) {
        self.lock().scroll.scroll_to(offset);
    }

    /// Jump to the newest message
    pub fn scroll_to_bottom(&self) {
        self.lock().scroll.scroll_to_bottom();
    }

    /// Whether the current position should trigger loading an older page
    pub fn should_load_older(&self) -> bool {
        let state = self.lock();
        state.is_open
            && state.has_more
            && !state.is_initial_load
            && !state.loading
            && !state.loading_more
            && state.scroll.is_near_top(self.config.top_threshold)
    }

    /// Load the next older page and prepend it without moving the visible rows
    ///
    /// Ignored (returns `Ok(0)`) while another older-page load is in flight,
    /// during the initial load, or once history is exhausted. A page shorter
    /// than the page size marks history as exhausted.
    pub async fn load_older(&self) -> Result<usize> {
        let (generation, page) = {
            let mut state = self.lock();
            if !state.is_open
                || state.loading_more
                || state.loading
                || state.is_initial_load
                || !state.has_more
            {
                return Ok(0);
            }
            state.loading_more = true;
            (state.generation, state.current_page + 1)
        };

        let result = self
            .service
            .list_messages(self.room_id, page, self.config.page_size, false)
            .await;

        let mut state = self.lock();
        if !state.accepts(generation) {
            return Err(Error::Closed);
        }
        state.loading_more = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Failed to load page {} for room {}: {}",
                    page, self.room_id, e
                );
                state.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let fetched = response.messages.len();
        let older = unseen(response.messages, &state.known_ids());
        let added = older.len();

        // Prepend, measure, correct offset: one step under the lock
        let old_height = state.scroll.content_height;
        let mut merged = older;
        merged.append(&mut state.messages);
        state.messages = merged;
        let new_height = state.measure();
        state.scroll.preserve_after_prepend(old_height, new_height);

        state.current_page = page;
        if fetched < self.config.page_size as usize {
            state.has_more = false;
            debug!("Reached start of history for room {}", self.room_id);
        }

        Ok(added)
    }

    /// Current draft text
    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    /// Replace the draft text
    pub fn set_draft(&self, text: impl Into<String>) {
        self.lock().draft = text.into();
    }

    /// Append a character to the draft
    pub fn push_draft_char(&self, c: char) {
        self.lock().draft.push(c);
    }

    /// Remove the last draft character
    pub fn pop_draft_char(&self) {
        self.lock().draft.pop();
    }

    /// Send the draft as a text message
    ///
    /// The draft is cleared before the request goes out and is not restored
    /// if it fails.
    pub async fn send_draft(&self) -> Result<ServerMessage> {
        let draft = std::mem::take(&mut self.lock().draft);
        self.send_text(&draft).await
    }

    /// Send a text message optimistically
    pub async fn send_text(&self, text: &str) -> Result<ServerMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("message is empty".to_string()));
        }
        self.send(OutgoingMessage::Text(text.to_string())).await
    }

    /// Upload media and send it optimistically
    ///
    /// The pending entry appears before the upload starts and is removed if
    /// either the upload or the send fails.
    pub async fn send_media(
        &self,
        kind: MediaKind,
        file_name: &str,
        bytes: Vec<u8>,
        uploader: &dyn MediaUploader,
    ) -> Result<ServerMessage> {
        let placeholder = PendingMessage {
            temp_id: new_temp_id(),
            content: kind.placeholder().to_string(),
            message_type: kind.message_type(),
            file_url: None,
            created_at: Utc::now(),
        };
        let (generation, temp_id) = self.push_pending(placeholder)?;

        let url = match uploader.upload(file_name, bytes).await {
            Ok(url) => url,
            Err(e) => {
                self.discard_pending(generation, &temp_id, &e);
                return Err(e);
            }
        };

        {
            let mut state = self.lock();
            if let Some(index) = state.pending_index(&temp_id) {
                if let ChatMessage::Pending(pending) = &mut state.messages[index] {
                    pending.file_url = Some(url.clone());
                }
            }
        }

        self.deliver(generation, temp_id, OutgoingMessage::Media { kind, url })
            .await
    }

    /// Send a prepared message optimistically
    ///
    /// A pending entry is appended and the view scrolls to it. On success the
    /// entry is replaced in place by the confirmed message; on failure it is
    /// removed, leaving the window exactly as it was.
    pub async fn send(&self, outgoing: OutgoingMessage) -> Result<ServerMessage> {
        let (generation, temp_id) = self.push_pending(PendingMessage::new(&outgoing))?;
        self.deliver(generation, temp_id, outgoing).await
    }

    async fn deliver(
        &self,
        generation: u64,
        temp_id: String,
        outgoing: OutgoingMessage,
    ) -> Result<ServerMessage> {
        match self.service.send_message(self.room_id, &outgoing).await {
            Ok(confirmed) => {
                self.confirm_pending(generation, &temp_id, confirmed.clone());

                if let Some(callback) = &self.on_sent {
                    let at = confirmed.created_at.unwrap_or_else(Utc::now);
                    callback(RoomPatch::sent(self.room_id, outgoing.preview(), at));
                }
                Ok(confirmed)
            }
            Err(e) => {
                self.discard_pending(generation, &temp_id, &e);
                Err(e)
            }
        }
    }

    fn push_pending(&self, pending: PendingMessage) -> Result<(u64, String)> {
        let mut state = self.lock();
        if !state.is_open {
            return Err(Error::Closed);
        }

        let temp_id = pending.temp_id.clone();

        state.messages.push(ChatMessage::Pending(pending));
        let height = state.measure();
        state.scroll.set_content_height(height);
        state.scroll.scroll_to_bottom();

        Ok((state.generation, temp_id))
    }

    fn confirm_pending(&self, generation: u64, temp_id: &str, confirmed: ServerMessage) {
        let mut state = self.lock();
        if !state.accepts(generation) {
            return;
        }
        let Some(index) = state.pending_index(temp_id) else {
            return;
        };

        let confirmed_id = MessageId::Server(confirmed.message_id);
        let already_merged = state.messages.iter().any(|m| m.id() == confirmed_id);
        if already_merged {
            // A live refresh got there first
            state.messages.remove(index);
        } else {
            state.messages[index] = ChatMessage::Confirmed(confirmed);
        }

        // The latest page will now end with our own message
        state.latest_id = state.last_confirmed_id();
        let height = state.measure();
        state.scroll.set_content_height(height);
        info!("Confirmed message {:?} in room {}", confirmed_id, self.room_id);
    }

    fn discard_pending(&self, generation: u64, temp_id: &str, error: &Error) {
        let mut state = self.lock();
        if !state.accepts(generation) {
            return;
        }
        if let Some(index) = state.pending_index(temp_id) {
            state.messages.remove(index);
            let height = state.measure();
            state.scroll.set_content_height(height);
        }
        state.last_error = Some(format!("Failed to send: {}", error));
        warn!("Send failed in room {}: {}", self.room_id, error);
    }
}
