//! Bounded, time-expiring LRU cache for upstream responses.
//!
//! Keys are stable strings derived from resource identity (`file:<key>`,
//! `project:<id>`, `variables:<key>`). An entry is never returned after its
//! TTL has elapsed; inserting beyond capacity evicts the least-recently-used
//! entry.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;

/// One cached upstream response body.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

/// LRU cache mapping resource key to the last decoded response body.
pub struct ResponseCache {
    entries: LruCache<String, CacheEntry>,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl ResponseCache {
    /// Creates a cache with the given entry capacity and TTL.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap()),
            ),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up a fresh entry, refreshing its recency.
    ///
    /// Expired entries are dropped on access and reported as misses.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|e| e.inserted_at.elapsed() >= self.ttl);

        if expired {
            self.entries.pop(key);
        }

        if let Some(entry) = self.entries.get(key) {
            self.hits += 1;
            Some(entry.value.clone())
        } else {
            self.misses += 1;
            None
        }
    }

    /// Stores a response body, evicting the least-recently-used entry when
    /// the cache is at capacity.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.entries.put(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops an entry, if present. Used after successful writes so the next
    /// read fetches fresh state.
    pub fn invalidate(&mut self, key: &str) {
        self.entries.pop(key);
    }

    /// Number of entries currently held (including not-yet-expired ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total lookups answered from the cache.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Total lookups that went to the network.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(capacity: usize, ttl_ms: u64) -> ResponseCache {
        ResponseCache::new(capacity, Duration::from_millis(ttl_ms))
    }

    #[test]
    fn hit_returns_exact_stored_value() {
        let mut cache = cache(10, 60_000);
        let value = json!({ "name": "Design System", "version": "42" });

        assert!(cache.get("file:abc").is_none());
        cache.put("file:abc", value.clone());
        assert_eq!(cache.get("file:abc"), Some(value));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let mut cache = cache(10, 20);
        cache.put("file:abc", json!(1));

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("file:abc").is_none());
        // The expired entry is gone entirely, not just hidden.
        assert!(cache.is_empty());
    }

    #[test]
    fn insertion_beyond_capacity_evicts_lru() {
        let mut cache = cache(2, 60_000);
        cache.put("a", json!(1));
        cache.put("b", json!(2));
        cache.put("c", json!(3)); // evicts "a"

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = cache(2, 60_000);
        cache.put("a", json!(1));
        cache.put("b", json!(2));
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a").is_some());
        cache.put("c", json!(3));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn invalidate_drops_entry() {
        let mut cache = cache(10, 60_000);
        cache.put("variables:abc", json!({ "meta": {} }));
        cache.invalidate("variables:abc");
        assert!(cache.get("variables:abc").is_none());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut cache = cache(0, 60_000);
        cache.put("a", json!(1));
        assert_eq!(cache.len(), 1);
    }
}
