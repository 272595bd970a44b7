//! Room list cache
//!
//! Holds the last room list response for a short window. Local actions patch
//! it in place instead of invalidating it, so the admin's own writes stay
//! visible until the next authoritative fetch replaces them.

use crate::model::{RoomListResponse, RoomPatch};
use crate::sync::clock::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
struct CacheEntry {
    page: u32,
    limit: u32,
    response: RoomListResponse,
    fetched_at: Instant,
}

/// Time-bounded cache of the admin's room list
#[derive(Debug)]
pub struct RoomCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: Option<CacheEntry>,
}

impl RoomCache {
    /// Create an empty cache with the given freshness window
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entry: None,
        }
    }

    /// Return the cached response for `(page, limit)` if it is still fresh
    pub fn get(&self, page: u32, limit: u32) -> Option<RoomListResponse> {
        let entry = self.entry.as_ref()?;
        if entry.page != page || entry.limit != limit {
            return None;
        }

        let age = self.clock.now().saturating_duration_since(entry.fetched_at);
        if age >= self.ttl {
            debug!("Room cache stale ({:?} old)", age);
            return None;
        }

        Some(entry.response.clone())
    }

    /// Replace the cached response and restart the freshness window
    pub fn put(&mut self, page: u32, limit: u32, response: RoomListResponse) {
        self.entry = Some(CacheEntry {
            page,
            limit,
            response,
            fetched_at: self.clock.now(),
        });
    }

    /// Drop the cached response
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Merge a patch into the cached room, if present
    ///
    /// Does not touch the freshness window. Returns `false` when the cache is
    /// empty or does not contain the room.
    pub fn patch_room(&mut self, patch: &RoomPatch) -> bool {
        match self.entry.as_mut() {
            Some(entry) => entry.response.patch_room(patch),
            None => false,
        }
    }

    /// Whether any response is held, fresh or not
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}
