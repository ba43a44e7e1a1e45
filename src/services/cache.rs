//! Bounded in-memory query cache with a fixed time-to-live per cache.
//!
//! Each query kind (parks, dates, schedules, wait samples) gets its own
//! `TtlCache` with its own staleness window and capacity. Entries carry their
//! expiry instant; a stale entry is dropped on read, and the capacity bound
//! evicts cold entries no matter how many distinct keys are requested.
//! Entries are replaced wholesale; there is no partial update.

use quick_cache::sync::Cache;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    expires_at: Instant,
    value: V,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Cache<K, CacheEntry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Cache::new(capacity),
        }
    }

    /// The cached value, if present and not yet expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.expires_at > Instant::now() {
            Some(entry.value)
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                expires_at: Instant::now() + self.ttl,
                value,
            },
        );
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
