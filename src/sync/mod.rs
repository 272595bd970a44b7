//! Chat synchronization core
//!
//! This module keeps the admin's room list consistent with the backend:
//! - `clock` - Injectable time source for cache freshness
//! - `cache` - Short-lived room list cache with in-place optimistic patches
//! - `service` - Data access over `ChatApi`, owning the cache
//! - `polling` - Single room list poller with change detection and fan-out

pub mod cache;
pub mod clock;
pub mod polling;
pub mod service;

pub use cache::RoomCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use polling::{
    ChangeDescriptor, ChangeDetector, PollingCoordinator, RoomSnapshot, Subscriber, Subscription,
    UpdateType,
};
pub use service::ChatService;
