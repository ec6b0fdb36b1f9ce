//! weathercache library
//!
//! A read-through cache for a weather API. Requests are keyed by coordinates,
//! units and language; fresh responses are served from memory and misses are
//! fetched, relayed and stored with a TTL derived from the request's update
//! interval. A background janitor evicts entries nobody asks for again.

pub mod cache;
pub mod cli;
pub mod coordinator;
pub mod data;
pub mod janitor;

pub use coordinator::{Coordinator, RelayError, Resolved, Source};
pub use janitor::Janitor;
