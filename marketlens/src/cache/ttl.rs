//! Time-bounded key/value cache.
//!
//! Entries are valid while `now - inserted_at < ttl`. Expired entries are
//! treated as absent and evicted by the lookup that finds them. Owners sweep
//! the rest with [`TtlCache::purge_expired`]; there is no background task.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Default lifetime of cached lookups (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A cached value and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
    pub inserted_at: Instant,
}

impl<K, V> CacheEntry<K, V> {
    fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            inserted_at: Instant::now(),
        }
    }

    /// Returns true while the entry is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Counters for cache effectiveness.
#[derive(Debug, Default)]
struct TtlCacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries evicted because they outlived the TTL
    pub expirations: u64,
}

impl TtlCacheStats {
    /// Returns the hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

enum Probe<V> {
    Fresh(V),
    Expired,
    Missing,
}

/// Concurrent cache with a single TTL for all entries.
///
/// Each instance is independent; callers own and inject it.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<K, V>>,
    ttl: Duration,
    counters: TtlCacheCounters,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            counters: TtlCacheCounters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the value if present and fresh. Expired entries are evicted.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();

        // Guard must be released before eviction touches the same shard
        let probe = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl, now) => Probe::Fresh(entry.value.clone()),
            Some(_) => Probe::Expired,
            None => Probe::Missing,
        };

        match probe {
            Probe::Fresh(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Probe::Expired => {
                // A concurrent writer may have refreshed the entry meanwhile
                if self
                    .entries
                    .remove_if(key, |_, entry| !entry.is_fresh(self.ttl, now))
                    .is_some()
                {
                    self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                }
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Probe::Missing => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `value`, replacing any previous entry and restarting its TTL.
    pub fn insert(&self, key: K, value: V) {
        self.entries
            .insert(key.clone(), CacheEntry::new(key, value));
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    pub fn contains_fresh(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map_or(false, |entry| entry.is_fresh(self.ttl, now))
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Evicts every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(self.ttl, now));
        let removed = before.saturating_sub(self.entries.len());
        self.counters
            .expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn stats(&self) -> TtlCacheStats {
        TtlCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_is_returned() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("k".to_string(), 42);

        assert_eq!(cache.get(&"k".to_string()), Some(42));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_at_ttl() {
        let cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("k".to_string(), 42);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get(&"k".to_string()), Some(42));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&"k".to_string()), None);

        // Lazily evicted
        assert!(cache.is_empty());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_restarts_ttl() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1u32, "old");

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert(1u32, "new");
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get(&1), Some("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_key_counts_miss() {
        let cache: TtlCache<u32, u32> = TtlCache::new(DEFAULT_TTL);
        assert_eq!(cache.get(&7), None);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_ratio(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1u32, 1u32);
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.insert(2u32, 2u32);
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_fresh(&2));
        assert!(!cache.contains_fresh(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_and_clear() {
        let cache = TtlCache::new(DEFAULT_TTL);
        cache.insert(1u32, 'a');
        cache.insert(2u32, 'b');

        assert_eq!(cache.remove(&1), Some('a'));
        cache.clear();
        assert!(cache.is_empty());
    }
}
