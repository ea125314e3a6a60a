//! Response cache for conditional BVG requests.
//!
//! Entries are keyed by request URL only. Query parameters are not part of
//! the key, so two `/stops` lookups with different `query` strings share one
//! entry; the server's `If-None-Match` answer is what keeps them honest.
//!
//! An entry whose `expiry` is `None` is never served without a round trip.
//! Its body is still kept so a `304 Not Modified` can be answered locally.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;
use serde_json::Value;

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Maximum number of cached URLs.
    pub max_capacity: u64,

    /// Entries untouched for this long are swept.
    pub idle_ttl: Duration,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1024,
            idle_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// A cached response: its validator, decoded body and freshness deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub etag: String,
    pub body: Arc<Value>,
    /// `None` means "always revalidate".
    pub expiry: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(etag: impl Into<String>, body: Value, expiry: Option<DateTime<Utc>>) -> Self {
        Self {
            etag: etag.into(),
            body: Arc::new(body),
            expiry,
        }
    }

    /// Whether the entry may be served at `now` without contacting the server.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry > now)
    }
}

/// URL → [`CacheEntry`] map owned by a single client.
///
/// Bounded by capacity and idle time. Cloning shares the underlying storage;
/// concurrent writers to the same URL race, last write wins.
#[derive(Clone)]
pub struct ResponseCache {
    entries: MokaCache<String, Arc<CacheEntry>>,
}

impl ResponseCache {
    /// Create an empty cache with the given configuration.
    pub fn new(config: &ResponseCacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_idle(config.idle_ttl)
            .build();

        Self { entries }
    }

    /// Look up the entry stored for `url`.
    pub async fn get(&self, url: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(url).await
    }

    /// Store or overwrite the entry for `url`.
    pub async fn insert(&self, url: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(url.into(), Arc::new(entry)).await;
    }

    /// Approximate number of entries (pending maintenance may lag).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&ResponseCacheConfig::default())
    }
}
