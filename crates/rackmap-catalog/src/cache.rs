//! URL-keyed response cache

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Cached response payload
#[derive(Debug, Clone)]
struct CachedPage {
    /// Decoded JSON payload
    payload: Value,
    /// When cached
    stored_at: Instant,
}

impl CachedPage {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// Response cache keyed by the exact request URL.
///
/// Entries are written once on first fetch and never mutated in place.
/// Concurrent loaders hit disjoint keys; the lock only guards the map
/// structure itself, no cross-key ordering is promised.
#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CachedPage>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create an empty cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a live entry for `url`, if one exists
    pub async fn get(&self, url: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        match entries.get(url) {
            Some(page) if !page.is_expired(self.ttl) => {
                debug!(%url, "cache hit");
                Some(page.payload.clone())
            }
            _ => None,
        }
    }

    /// Store a payload under `url`
    pub async fn put(&self, url: &str, payload: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            url.to_string(),
            CachedPage {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of entries currently stored, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Whether a fetch consults and/or populates the cache
#[derive(Debug, Clone, Copy, Default)]
pub struct CachePolicy {
    /// Serve a live cached entry instead of fetching
    pub read: bool,
    /// Store the decoded payload after a successful fetch
    pub write: bool,
}

impl CachePolicy {
    /// Bypass the cache entirely
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            read: false,
            write: false,
        }
    }

    /// Read live entries and populate on miss
    #[must_use]
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
        }
    }
}
