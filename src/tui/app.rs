//! TUI application state
//!
//! `App` owns the room list, the open conversation and the poller. Background
//! work (polling, sends, history loads) reports back through an unbounded
//! channel that the event loop drains once per frame.

use super::types::{AppEvent, Screen};
use super::ui::conversation::message_pane;
use crate::{
    api::ChatApi,
    model::{RoomListResponse, RoomPatch, RoomStatus, Settings},
    sync::{ChangeDescriptor, ChatService, PollingCoordinator, Subscriber, Subscription},
    view::{ConversationView, RoomListUpdate, RoomListView, WrappedLayout},
};
use ratatui::layout::Rect;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

/// Polling failures in a row before the status bar reports the backend lost
pub const CONNECTION_LOST_AFTER: u32 = 3;

/// Application state
pub struct App {
    /// Screen being shown
    pub current_screen: Screen,
    /// Set when the user asks to exit
    pub should_quit: bool,
    /// Status bar text
    pub status_message: Option<String>,
    /// Room list view model
    pub room_list: RoomListView,
    /// Open conversation, if any
    pub conversation: Option<Arc<ConversationView>>,
    settings: Settings,
    service: Arc<ChatService>,
    poller: PollingCoordinator,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    message_pane: Option<Rect>,
    _subscription: Subscription,
}

impl App {
    /// Build the app over a chat backend
    pub fn new(settings: Settings, api: Arc<dyn ChatApi>) -> Self {
        let service = Arc::new(ChatService::new(api, settings.room_cache_ttl()));
        let poller = PollingCoordinator::new(service.clone(), settings.polling_config());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let tx = events_tx.clone();
        let forward: Subscriber = Arc::new(
            move |response: &RoomListResponse, change: &ChangeDescriptor| {
                let update = RoomListUpdate::Polled {
                    response: response.clone(),
                    change: change.clone(),
                };
                let _ = tx.send(AppEvent::RoomList(update));
            },
        );
        let subscription = poller.subscribe(forward);

        let room_list = RoomListView::new(service.clone(), settings.room_page_size);

        Self {
            current_screen: Screen::RoomList,
            should_quit: false,
            status_message: None,
            room_list,
            conversation: None,
            settings,
            service,
            poller,
            events_tx,
            events_rx,
            message_pane: None,
            _subscription: subscription,
        }
    }

    /// Initial load and background polling
    pub async fn start(&mut self) {
        if let Err(e) = self.room_list.load(false).await {
            self.status_message = Some(format!("Failed to load rooms: {}", e));
        }
        self.poller.start_polling();
        info!("Console started against {}", self.settings.api_base_url);
    }

    /// Stop background work before exit
    pub fn shutdown(&mut self) {
        self.close_conversation();
        self.poller.stop_polling();
    }

    /// Apply events queued by background tasks
    pub fn process_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::RoomList(update) => self.room_list.apply_update(update),
                AppEvent::Status(message) => self.status_message = Some(message),
            }
        }
    }

    /// Whether polling has failed often enough to call the backend lost
    pub fn connection_lost(&self) -> bool {
        self.poller.consecutive_failures() >= CONNECTION_LOST_AFTER
    }

    /// Open the selected room
    pub async fn open_selected(&mut self) {
        let Some(room_id) = self.room_list.selected_id() else {
            return;
        };
        self.close_conversation();

        let tx = self.events_tx.clone();
        let view = ConversationView::new(
            room_id,
            self.service.clone(),
            self.settings.conversation_config(),
        )
        .with_on_sent(Arc::new(move |patch: RoomPatch| {
            let _ = tx.send(AppEvent::RoomList(RoomListUpdate::Local(patch)));
        }));
        let view = Arc::new(view);

        if let Some(area) = self.message_pane {
            view.set_layout(Box::new(WrappedLayout::new(area.width)));
            view.set_viewport_height(u32::from(area.height));
        }

        match view.open().await {
            Ok(true) => {
                self.room_list
                    .apply_update(RoomListUpdate::Local(RoomPatch::read(room_id)));
                self.status_message = None;
            }
            Ok(false) => {
                self.status_message = view.snapshot().last_error;
            }
            Err(e) => {
                self.status_message = Some(format!("Failed to load messages: {}", e));
            }
        }

        view.start_live_updates();
        self.conversation = Some(view);
        self.current_screen = Screen::Conversation;
    }

    /// Close the open conversation and return to the room list
    pub fn close_conversation(&mut self) {
        if let Some(view) = self.conversation.take() {
            view.close();
        }
        self.current_screen = Screen::RoomList;
    }

    /// Keep the conversation's scroll model in step with the terminal size
    pub fn sync_viewport(&mut self, area: Rect) {
        let pane = message_pane(area);
        if self.message_pane == Some(pane) {
            return;
        }
        self.message_pane = Some(pane);

        if let Some(view) = &self.conversation {
            view.set_layout(Box::new(WrappedLayout::new(pane.width)));
            view.set_viewport_height(u32::from(pane.height));
        }
    }

    /// Send the draft in the background
    pub fn send_draft(&mut self) {
        let Some(view) = self.conversation.clone() else {
            return;
        };
        if view.draft().trim().is_empty() {
            return;
        }

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = view.send_draft().await {
                warn!("Send failed: {}", e);
                let _ = tx.send(AppEvent::Status(format!("Send failed: {}", e)));
            }
        });
    }

    /// Scroll the conversation and fetch older history near the top
    pub fn scroll_conversation(&mut self, delta: i64) {
        let Some(view) = self.conversation.clone() else {
            return;
        };
        view.scroll_by(delta);

        if view.should_load_older() {
            let tx = self.events_tx.clone();
            tokio::spawn(async move {
                if let Err(e) = view.load_older().await {
                    let _ = tx.send(AppEvent::Status(format!("Failed to load history: {}", e)));
                }
            });
        }
    }

    /// Manual refresh of the room list
    pub async fn refresh(&mut self) {
        match self.room_list.refresh().await {
            Ok(()) => self.status_message = Some("Rooms refreshed".to_string()),
            Err(e) => self.status_message = Some(format!("Refresh failed: {}", e)),
        }
    }

    /// Claim the selected room
    pub async fn assign_selected(&mut self) {
        match self.room_list.assign_selected().await {
            Ok(()) => self.status_message = Some("Room assigned".to_string()),
            Err(e) => self.status_message = Some(format!("Assign failed: {}", e)),
        }
    }

    /// Set the selected room's status
    pub async fn set_selected_status(&mut self, status: RoomStatus) {
        match self.room_list.set_selected_status(status).await {
            Ok(()) => {
                self.status_message = Some(format!("Room marked {}", status.label()));
            }
            Err(e) => self.status_message = Some(format!("Status change failed: {}", e)),
        }
    }
}
