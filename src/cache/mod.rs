//! Cache module for weather API responses
//!
//! This module holds the in-memory store plus the two policies that drive it:
//! how a request maps to a cache key, and how long a stored response stays
//! fresh. Entries are never persisted; the store lives as long as its owner.

mod key;
mod store;
mod ttl;

pub use key::{derive_key, CacheKey};
pub use store::{shared, CacheEntry, CacheStore, SharedStore};
pub use ttl::{compute_ttl, TTL_PERCENT};
