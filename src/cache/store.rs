//! In-memory store for relayed weather responses
//!
//! Entries are keyed by `CacheKey` and carry the instant they were written and
//! their TTL. A stored entry is never refreshed in place: a newer fetch simply
//! overwrites it, and stale entries are removed on read or by the janitor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::CacheKey;

/// A stored response plus the metadata that decides its freshness
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// When the response was written
    pub stored_at: Instant,
    /// How long the entry is trusted, fixed at write time
    pub ttl: Duration,
    /// The opaque response payload
    pub body: Arc<Value>,
}

impl CacheEntry {
    pub fn new(stored_at: Instant, ttl: Duration, body: Value) -> Self {
        Self {
            stored_at,
            ttl,
            body: Arc::new(body),
        }
    }

    /// Whether the entry is still fresh at `now` (age strictly below TTL)
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Keyed collection of cache entries
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<CacheKey, CacheEntry>,
}

/// Store handle shared between the coordinator and the janitor
pub type SharedStore = Arc<Mutex<CacheStore>>;

/// Wraps an empty store for sharing
pub fn shared() -> SharedStore {
    Arc::new(Mutex::new(CacheStore::new()))
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Stores `entry`, replacing whatever was under `key`
    pub fn put(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub fn delete(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&CacheKey, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry that is stale at `now`
    ///
    /// Returns the number of entries evicted.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before - self.entries.len()
    }
}
