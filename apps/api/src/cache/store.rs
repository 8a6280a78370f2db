//! Result Cache: TTL + capacity bounded store for generated field text.
//!
//! Eviction is FIFO by creation time: when a new key would exceed capacity, the
//! entry created earliest goes, regardless of how recently it was read.
//! Expired entries are dropped lazily on `get` and in bulk by `purge_expired`.
//!
//! One `std::sync::Mutex` guards the map. It is never held across an await, so a
//! write either completes or never starts even when the calling task is cancelled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::fingerprint::Fingerprint;
use crate::load_guard::Reclaim;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    /// Insertion order; breaks ties between entries created at the same instant.
    sequence: u64,
}

struct Inner<V> {
    entries: HashMap<Fingerprint, CacheEntry<V>>,
    next_sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct ResultCache<V> {
    inner: Mutex<Inner<V>>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity.min(DEFAULT_CAPACITY)),
                next_sequence: 0,
            }),
            capacity,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock leaves the map structurally intact; keep serving.
    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set(&self, key: Fingerprint, value: V) {
        if self.capacity == 0 {
            return;
        }

        let now = Instant::now();
        let mut inner = self.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.created_at, entry.sequence))
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(key = %oldest, "Evicted oldest cache entry");
            }
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + self.ttl,
                sequence,
            },
        );
    }

    /// Removes every entry whose key (`operation:digest`) contains `pattern`.
    pub fn invalidate_matching(&self, pattern: &str) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.to_string().contains(pattern));
        before - inner.entries.len()
    }

    /// Drops every entry and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        removed
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.expires_at > now);
        let purged = before - inner.entries.len();
        self.evictions.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl<V: Clone + Send> Reclaim for ResultCache<V> {
    fn reclaim(&self) {
        let purged = self.purge_expired();
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> Fingerprint {
        Fingerprint::new("title", &json!({ "keyword": name })).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_miss_after() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        cache.set(key("a"), "value".to_string());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&key("a")), Some("value".to_string()));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&key("a")), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest_created() {
        let cache = ResultCache::new(2, DEFAULT_TTL);
        cache.set(key("a"), 1);
        cache.set(key("b"), 2);
        cache.set(key("c"), 3);

        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.get(&key("b")), Some(2));
        assert_eq!(cache.get(&key("c")), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_ignores_recent_reads() {
        let cache = ResultCache::new(2, DEFAULT_TTL);
        cache.set(key("a"), 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.set(key("b"), 2);

        // Reading "a" does not protect it
        assert_eq!(cache.get(&key("a")), Some(1));
        cache.set(key("c"), 3);
        assert_eq!(cache.get(&key("a")), None);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict() {
        let cache = ResultCache::new(2, DEFAULT_TTL);
        cache.set(key("a"), 1);
        cache.set(key("b"), 2);
        cache.set(key("a"), 10);
        assert_eq!(cache.get(&key("a")), Some(10));
        assert_eq!(cache.get(&key("b")), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_and_reclaim() {
        let cache = ResultCache::new(10, Duration::from_secs(10));
        cache.set(key("old"), 1);
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.set(key("new"), 2);
        tokio::time::advance(Duration::from_secs(6)).await;

        cache.reclaim();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("new")), Some(2));
    }

    #[test]
    fn test_invalidate_matching_and_clear() {
        let cache = ResultCache::new(10, DEFAULT_TTL);
        let description = Fingerprint::new("description", &json!({"k": 1})).unwrap();
        cache.set(key("a"), 1);
        cache.set(key("b"), 2);
        cache.set(description.clone(), 3);

        assert_eq!(cache.invalidate_matching("title:"), 2);
        assert_eq!(cache.get(&description), Some(3));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let cache = ResultCache::new(10, DEFAULT_TTL);
        cache.set(key("a"), 1);
        cache.get(&key("a"));
        cache.get(&key("missing"));

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = ResultCache::new(0, DEFAULT_TTL);
        cache.set(key("a"), 1);
        assert!(cache.is_empty());
    }
}
