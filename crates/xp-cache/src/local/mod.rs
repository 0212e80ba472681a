//! Process-local hot cache (tier 1)
//!
//! A small, capacity-bounded TTL map in front of the remote cache, meant
//! only for the hottest keys (active guild settings). Lookups are
//! sub-millisecond and lock-free for readers; eviction is approximate
//! (expired-first, then arbitrary) since precision does not matter for a
//! short-TTL hot cache.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Capacity-bounded TTL cache keyed by `K`
pub struct LocalCache<K, V> {
    map: DashMap<K, Entry<V>>,
    capacity: usize,
    ttl: Duration,
}

impl<K, V> LocalCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` live entries with the
    /// given TTL
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            map: DashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Get a live value; expired entries are removed on access
    pub fn get(&self, key: &K) -> Option<V> {
        let hit = {
            let entry = self.map.get(key)?;
            if entry.expires_at > Instant::now() {
                Some(entry.value.clone())
            } else {
                None
            }
        };
        if hit.is_none() {
            self.map.remove(key);
        }
        hit
    }

    /// Insert a value, evicting if the cache is full
    pub fn insert(&self, key: K, value: V) {
        if self.map.len() >= self.capacity && !self.map.contains_key(&key) {
            self.evict_one();
        }
        self.map.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Remove a key (invalidation on write-through refresh)
    pub fn remove(&self, key: &K) {
        self.map.remove(key);
    }

    /// Drop all expired entries
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.expires_at > now);
    }

    /// Number of entries currently held (including not-yet-purged expired)
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Evict one entry: any expired one if present, otherwise arbitrary
    fn evict_one(&self) {
        let now = Instant::now();
        let victim = self
            .map
            .iter()
            .find(|entry| entry.expires_at <= now)
            .or_else(|| self.map.iter().next())
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.map.remove(&key);
        }
    }
}
