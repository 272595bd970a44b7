//! Room list polling and change detection
//!
//! One `PollingCoordinator` runs per admin session. Views subscribe to it
//! instead of running their own loops, so every view sees the same snapshot
//! per tick and the backend sees a single poller.
//!
//! Each detection cycle force-fetches the room list, diffs it against the
//! last observed per-room snapshot and notifies subscribers of external
//! changes. Optimistic patches published by `ChatService` are folded into the
//! snapshots, so the admin's own actions are not re-announced.

use crate::{
    Result,
    model::{PollingConfig, RoomListResponse, RoomPatch},
    sync::service::ChatService,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{broadcast, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Callback invoked with the full room list and what changed
pub type Subscriber = Arc<dyn Fn(&RoomListResponse, &ChangeDescriptor) + Send + Sync>;

/// Kind of change that triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// At least one room has new message activity
    Message,
    /// Only new rooms appeared
    Room,
}

/// What a detection cycle found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescriptor {
    /// Some room's timestamp, unread count or preview changed
    pub has_new_messages: bool,
    /// New rooms appeared
    pub has_new_rooms: bool,
    /// `Message` if `has_new_messages`, else `Room`
    pub update_type: UpdateType,
    /// Always true for poll-sourced changes
    pub is_external_update: bool,
    /// Rooms whose snapshot differed, in list order
    pub changed_rooms: Vec<i64>,
}

/// Last observed summary of a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Latest message timestamp
    pub last_message_at: Option<DateTime<Utc>>,
    /// Unread count
    pub unread_count: u32,
    /// Preview text
    pub last_message: String,
}

/// Per-room diffing state
///
/// The first observation only records a baseline and reports nothing.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    snapshots: HashMap<i64, RoomSnapshot>,
    room_count: Option<usize>,
}

impl ChangeDetector {
    /// Create a detector with no baseline
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a baseline has been recorded
    pub fn is_primed(&self) -> bool {
        self.room_count.is_some()
    }

    /// Snapshot for a room, if observed
    pub fn snapshot(&self, room_id: i64) -> Option<&RoomSnapshot> {
        self.snapshots.get(&room_id)
    }

    /// Fold an optimistic local patch into the stored snapshot
    ///
    /// Rooms never observed are left alone.
    pub fn apply_local(&mut self, patch: &RoomPatch) {
        let Some(snapshot) = self.snapshots.get_mut(&patch.room_id) else {
            return;
        };

        if let Some(at) = patch.last_message_at {
            snapshot.last_message_at = Some(at);
        }
        if let Some(unread) = patch.unread_count {
            snapshot.unread_count = unread;
        }
        if let Some(last_message) = &patch.last_message {
            snapshot.last_message = last_message.clone();
        }
    }

    /// Diff a fresh room list against the stored snapshots
    ///
    /// Every room's snapshot is updated whether or not it changed.
    pub fn observe(&mut self, response: &RoomListResponse) -> Option<ChangeDescriptor> {
        let primed = self.is_primed();
        let mut has_new_messages = false;
        let mut has_new_rooms = false;
        let mut changed_rooms = Vec::new();

        for room in &response.rooms {
            let current = RoomSnapshot {
                last_message_at: room.last_message_at,
                unread_count: room.unread_count,
                last_message: room.last_message.clone(),
            };

            match self.snapshots.get(&room.room_id) {
                Some(previous) => {
                    let newer = match (current.last_message_at, previous.last_message_at) {
                        (Some(now), Some(before)) => now > before,
                        (Some(_), None) => true,
                        _ => false,
                    };
                    let differs = current.unread_count != previous.unread_count
                        || current.last_message != previous.last_message;

                    if newer || differs {
                        has_new_messages = true;
                        changed_rooms.push(room.room_id);
                    }
                }
                None if primed => {
                    has_new_rooms = true;
                    changed_rooms.push(room.room_id);
                }
                None => {}
            }

            self.snapshots.insert(room.room_id, current);
        }

        let count = response.rooms.len();
        if let Some(previous_count) = self.room_count {
            if count > previous_count {
                has_new_rooms = true;
            }
        }
        self.room_count = Some(count);

        if !primed || !(has_new_messages || has_new_rooms) {
            return None;
        }

        Some(ChangeDescriptor {
            has_new_messages,
            has_new_rooms,
            update_type: if has_new_messages {
                UpdateType::Message
            } else {
                UpdateType::Room
            },
            is_external_update: true,
            changed_rooms,
        })
    }
}

struct SubscriberEntry {
    id: u64,
    callback: Subscriber,
    refs: usize,
}

struct RunHandle {
    _stop: oneshot::Sender<()>,
}

struct DetectorState {
    detector: ChangeDetector,
    local_changes: broadcast::Receiver<RoomPatch>,
}

impl DetectorState {
    fn drain_local_changes(&mut self) {
        loop {
            match self.local_changes.try_recv() {
                Ok(patch) => self.detector.apply_local(&patch),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Dropped {} local room patches", skipped);
                }
                Err(_) => break,
            }
        }
    }
}

struct Inner {
    service: Arc<ChatService>,
    config: PollingConfig,
    subscribers: Mutex<Vec<SubscriberEntry>>,
    next_subscriber_id: AtomicU64,
    state: Mutex<DetectorState>,
    run: Mutex<Option<RunHandle>>,
    generation: AtomicU64,
    consecutive_failures: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Shared room list poller
///
/// Cheap to clone; all clones drive the same timer and subscriber set.
/// Construct once at startup and hand clones to the views that need it.
///
/// State machine: `Stopped -> Running` on `start_polling`, `Running -> Stopped`
/// on `stop_polling`. Each tick is a self-loop on `Running`.
#[derive(Clone)]
pub struct PollingCoordinator {
    inner: Arc<Inner>,
}

impl PollingCoordinator {
    /// Create a stopped coordinator
    pub fn new(service: Arc<ChatService>, config: PollingConfig) -> Self {
        let local_changes = service.subscribe_local_changes();
        Self {
            inner: Arc::new(Inner {
                service,
                config,
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
                state: Mutex::new(DetectorState {
                    detector: ChangeDetector::new(),
                    local_changes,
                }),
                run: Mutex::new(None),
                generation: AtomicU64::new(0),
                consecutive_failures: AtomicU32::new(0),
            }),
        }
    }

    /// Register a callback for external changes
    ///
    /// Registering the same `Arc` twice shares one slot, so it is still
    /// notified once per change. The callback stays registered until every
    /// returned `Subscription` for it is dropped.
    pub fn subscribe(&self, callback: Subscriber) -> Subscription {
        let mut subscribers = lock(&self.inner.subscribers);

        if let Some(entry) = subscribers
            .iter_mut()
            .find(|entry| Arc::ptr_eq(&entry.callback, &callback))
        {
            entry.refs += 1;
            return Subscription {
                id: entry.id,
                coordinator: Arc::downgrade(&self.inner),
            };
        }

        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        subscribers.push(SubscriberEntry {
            id,
            callback,
            refs: 1,
        });
        debug!("Polling subscriber {} registered", id);

        Subscription {
            id,
            coordinator: Arc::downgrade(&self.inner),
        }
    }

    /// Number of distinct registered callbacks
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    /// Start the periodic detection loop; no-op if already running
    ///
    /// The first cycle runs immediately and records the baseline.
    pub fn start_polling(&self) {
        let mut run = lock(&self.inner.run);
        if run.is_some() {
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                let Some(inner) = weak.upgrade() else { break };
                if let Err(e) = inner.run_cycle(Some(generation)).await {
                    warn!("Room polling failed: {}", e);
                }
            }

            debug!("Polling loop {} exited", generation);
        });

        *run = Some(RunHandle { _stop: stop_tx });
        info!("Room polling started (every {:?})", period);
    }

    /// Stop the loop; no-op if not running
    ///
    /// A fetch already in flight completes but its result is discarded.
    pub fn stop_polling(&self) {
        let mut run = lock(&self.inner.run);
        if run.take().is_some() {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            info!("Room polling stopped");
        }
    }

    /// Whether the loop is running
    pub fn is_polling(&self) -> bool {
        lock(&self.inner.run).is_some()
    }

    /// Run one detection cycle now, outside the timer
    ///
    /// Unlike timer ticks, fetch failures are returned to the caller.
    pub async fn force_check(&self) -> Result<Option<ChangeDescriptor>> {
        self.inner.run_cycle(None).await
    }

    /// Number of consecutive failed cycles since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::Relaxed)
    }
}

impl Inner {
    fn is_current(&self, generation: Option<u64>) -> bool {
        match generation {
            Some(generation) => self.generation.load(Ordering::SeqCst) == generation,
            None => true,
        }
    }

    async fn run_cycle(&self, generation: Option<u64>) -> Result<Option<ChangeDescriptor>> {
        // Patches made before the fetch are reflected in its result
        lock(&self.state).drain_local_changes();

        let response = match self
            .service
            .list_rooms(1, self.config.page_size, true)
            .await
        {
            Ok(response) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                response
            }
            Err(e) => {
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        if !self.is_current(generation) {
            debug!("Discarding poll result from stopped loop");
            return Ok(None);
        }

        let change = {
            let mut state = lock(&self.state);
            let change = state.detector.observe(&response);
            // Patches made during the fetch are not in its result yet
            state.drain_local_changes();
            change
        };

        let Some(change) = change else {
            return Ok(None);
        };

        debug!(
            "Detected change (messages: {}, rooms: {}) in {:?}",
            change.has_new_messages, change.has_new_rooms, change.changed_rooms
        );

        if !self.config.debounce.is_zero() {
            tokio::time::sleep(self.config.debounce).await;
        }

        if !self.is_current(generation) {
            return Ok(None);
        }

        self.notify(&response, &change);
        Ok(Some(change))
    }

    fn notify(&self, response: &RoomListResponse, change: &ChangeDescriptor) {
        let callbacks: Vec<Subscriber> = lock(&self.subscribers)
            .iter()
            .map(|entry| entry.callback.clone())
            .collect();

        for callback in callbacks {
            callback(response, change);
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut subscribers = lock(&self.subscribers);
        if let Some(index) = subscribers.iter().position(|entry| entry.id == id) {
            subscribers[index].refs -= 1;
            if subscribers[index].refs == 0 {
                subscribers.remove(index);
                debug!("Polling subscriber {} removed", id);
            }
        }
    }
}

/// Registration handle; dropping it unsubscribes
pub struct Subscription {
    id: u64,
    coordinator: Weak<Inner>,
}

impl Subscription {
    /// Identifier of the registered callback
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unsubscribe explicitly
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.coordinator.upgrade() {
            inner.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
