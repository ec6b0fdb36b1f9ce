//! Read-through coordination between the cache and the weather API
//!
//! Each request is validated, mapped to a cache key and served from the store
//! when a fresh entry exists. Otherwise the coordinator fetches from upstream,
//! stores the result and relays it on the outbound channel. The store lock is
//! never held across a fetch, so unrelated requests are served while one is
//! outstanding.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::cache::{compute_ttl, derive_key, CacheEntry, CacheKey, SharedStore};
use crate::data::{
    FetchError, Fetcher, PreconditionError, RequestDefaults, RequestMessage, WeatherRequest,
    WeatherResponse,
};

/// Why a request produced no response
#[derive(Debug, Error)]
pub enum RelayError {
    /// Request was rejected before lookup
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Upstream fetch failed; nothing was cached
    #[error("fetch for {key} failed: {source}")]
    Fetch {
        key: CacheKey,
        #[source]
        source: FetchError,
    },
}

/// Where a resolved body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Fetch,
}

/// A successfully resolved request
#[derive(Debug, Clone)]
pub struct Resolved {
    pub key: CacheKey,
    pub body: Arc<Value>,
    pub source: Source,
}

/// Serves requests from the cache, falling back to the fetcher
#[derive(Clone)]
pub struct Coordinator {
    store: SharedStore,
    fetcher: Arc<dyn Fetcher>,
    defaults: Arc<RequestDefaults>,
    outbound: mpsc::Sender<WeatherResponse>,
}

impl Coordinator {
    pub fn new(
        store: SharedStore,
        fetcher: Arc<dyn Fetcher>,
        defaults: RequestDefaults,
        outbound: mpsc::Sender<WeatherResponse>,
    ) -> Self {
        Self {
            store,
            fetcher,
            defaults: Arc::new(defaults),
            outbound,
        }
    }

    /// Resolves a request to a body, from the cache or from upstream
    ///
    /// A stale entry is deleted before fetching. A failed fetch leaves the
    /// store without an entry for the key.
    pub async fn resolve(&self, message: &RequestMessage) -> Result<Resolved, RelayError> {
        let (resolved, pending) = self.lookup(message).await?;
        if let Some(entry) = pending {
            self.commit(&resolved.key, entry).await;
        }
        Ok(resolved)
    }

    /// Resolves a request and relays the result on the outbound channel
    ///
    /// A fetched body is delivered first and stored afterwards. Failures are
    /// logged and the request is dropped; nothing is sent.
    pub async fn handle(&self, message: RequestMessage) {
        match self.lookup(&message).await {
            Ok((resolved, pending)) => {
                let response = WeatherResponse::new(&resolved.body, message.instance_id.as_ref());
                if self.outbound.send(response).await.is_err() {
                    warn!(key = %resolved.key, "outbound channel closed, response dropped");
                }
                if let Some(entry) = pending {
                    self.commit(&resolved.key, entry).await;
                }
            }
            Err(RelayError::Precondition(e)) => {
                warn!(error = %e, "dropping request");
            }
            Err(RelayError::Fetch { key, source }) => {
                error!(%key, error = %source, "weather fetch failed");
            }
        }
    }

    /// Serves a fresh hit, or fetches and returns the entry still to be stored
    async fn lookup(
        &self,
        message: &RequestMessage,
    ) -> Result<(Resolved, Option<CacheEntry>), RelayError> {
        let request = WeatherRequest::from_message(message, &self.defaults)?;
        let key = derive_key(&request);

        {
            let mut store = self.store.lock().await;
            let now = Instant::now();
            let cached = store
                .get(&key)
                .map(|entry| (entry.is_fresh(now), Arc::clone(&entry.body)));

            match cached {
                Some((true, body)) => {
                    debug!(%key, "cache hit");
                    let resolved = Resolved {
                        key,
                        body,
                        source: Source::Cache,
                    };
                    return Ok((resolved, None));
                }
                Some((false, _)) => {
                    store.delete(&key);
                    debug!(%key, "evicted stale entry on read");
                }
                None => debug!(%key, "cache miss"),
            }
        }

        let body = match self.fetcher.fetch(&request.fetch_url()).await {
            Ok(body) => body,
            Err(source) => return Err(RelayError::Fetch { key, source }),
        };

        let ttl = compute_ttl(request.update_interval_minutes);
        let entry = CacheEntry::new(Instant::now(), ttl, body);
        let resolved = Resolved {
            key,
            body: Arc::clone(&entry.body),
            source: Source::Fetch,
        };
        Ok((resolved, Some(entry)))
    }

    async fn commit(&self, key: &CacheKey, entry: CacheEntry) {
        let ttl = entry.ttl;
        self.store.lock().await.put(key.clone(), entry);
        debug!(%key, ttl_ms = ttl.as_millis() as u64, "stored fetched response");
    }

    /// Handles a request on its own task
    pub fn dispatch(&self, message: RequestMessage) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.handle(message).await })
    }
}
