use lru::LruCache;
use parking_lot::Mutex;
use std::{
    future::Future,
    hash::Hash,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::debug;

use super::clock::Clock;

/// Bounded associative cache shared between tasks.
///
/// Implementations never hold their lock across an `.await`; every method is
/// synchronous and returns owned copies.
pub trait BoundedCache<K, V>: Send + Sync {
    /// Returns a copy of the live entry for `key`, if any.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or replaces `key`, evicting according to the cache policy.
    fn insert(&self, key: K, value: V);

    fn remove(&self, key: &K) -> Option<V>;

    /// Mutates the live entry for `key` in place. Returns whether it existed.
    fn update(&self, key: &K, f: impl FnOnce(&mut V)) -> bool;

    /// Mutates every live entry in place without changing eviction order.
    fn update_all(&self, f: impl FnMut(&mut V));

    fn len(&self) -> usize;

    fn metrics(&self) -> CacheMetrics;
}

/// Read-through helper: serves `key` from `cache` or computes, stores and
/// returns it. Errors from `compute` are returned untouched and nothing is
/// stored.
pub async fn get_or_try_compute<C, K, V, E, F, Fut>(
    cache: &C,
    key: K,
    compute: F,
) -> Result<V, E>
where
    C: BoundedCache<K, V> + ?Sized,
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
{
    if let Some(value) = cache.get(&key) {
        return Ok(value);
    }

    let value = compute().await?;
    cache.insert(key, value.clone());
    Ok(value)
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired_removals: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired_removals: self.expired_removals.load(Ordering::Relaxed),
        }
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Size-bounded cache in access order: reads refresh an entry, and the least
/// recently used entry is evicted once capacity is exceeded. No expiry.
#[derive(Debug)]
pub struct RecencyCache<K: Hash + Eq, V> {
    name: &'static str,
    inner: Mutex<LruCache<K, V>>,
    counters: Counters,
}

impl<K: Hash + Eq, V> RecencyCache<K, V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            inner: Mutex::new(LruCache::new(non_zero(capacity))),
            counters: Counters::default(),
        }
    }
}

impl<K, V> BoundedCache<K, V> for RecencyCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        let value = self.inner.lock().get(key).cloned();
        match value {
            Some(_) => self.counters.hit(),
            None => self.counters.miss(),
        }
        value
    }

    fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        let is_new = !inner.contains(&key);
        let at_capacity = inner.len() == inner.cap().get();
        inner.put(key, value);
        if is_new && at_capacity {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("♻️ Cache {}: entrada menos usada desalojada", self.name);
        }
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().pop(key)
    }

    fn update(&self, key: &K, f: impl FnOnce(&mut V)) -> bool {
        match self.inner.lock().peek_mut(key) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    fn update_all(&self, mut f: impl FnMut(&mut V)) {
        for (_, value) in self.inner.lock().iter_mut() {
            f(value);
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot()
    }
}

/// Size- and time-bounded cache in insertion order.
///
/// Reads never refresh an entry. Past capacity the oldest inserted entry is
/// evicted, and an entry older than `ttl` reads as absent whether or not it
/// was accessed.
#[derive(Debug)]
pub struct ExpiringCache<K: Hash + Eq, V> {
    name: &'static str,
    inner: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl<K: Hash + Eq, V> ExpiringCache<K, V> {
    pub fn new(name: &'static str, capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            inner: Mutex::new(LruCache::new(non_zero(capacity))),
            ttl,
            clock,
            counters: Counters::default(),
        }
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) > self.ttl
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let mut removed = 0;

        // Oldest inserted entries sit at the tail, so stop at the first live one.
        while let Some((_, entry)) = inner.peek_lru() {
            if !self.is_expired(entry, now) {
                break;
            }
            inner.pop_lru();
            removed += 1;
        }

        if removed > 0 {
            self.counters
                .expired_removals
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("🧹 Cache {}: {} entradas expiradas eliminadas", self.name, removed);
        }
        removed
    }
}

impl<K, V> BoundedCache<K, V> for ExpiringCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.peek(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                self.counters.hit();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.pop(key);
            self.counters.expired_removals.fetch_add(1, Ordering::Relaxed);
        }
        self.counters.miss();
        None
    }

    fn insert(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            inserted_at: self.clock.now(),
        };
        let mut inner = self.inner.lock();

        // Re-inserting a key restarts both its age and its place in line.
        if inner.pop(&key).is_none() && inner.len() == inner.cap().get() {
            inner.pop_lru();
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("♻️ Cache {}: entrada más antigua desalojada", self.name);
        }
        inner.put(key, entry);
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().pop(key).map(|entry| entry.value)
    }

    fn update(&self, key: &K, f: impl FnOnce(&mut V)) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        match inner.peek_mut(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) <= self.ttl => {
                f(&mut entry.value);
                true
            }
            _ => false,
        }
    }

    fn update_all(&self, mut f: impl FnMut(&mut V)) {
        let now = self.clock.now();
        for (_, entry) in self.inner.lock().iter_mut() {
            if now.saturating_duration_since(entry.inserted_at) <= self.ttl {
                f(&mut entry.value);
            }
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn metrics(&self) -> CacheMetrics {
        self.counters.snapshot()
    }
}

/// Hit/miss and removal counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired_removals: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use pretty_assertions::assert_eq;

    fn expiring(
        capacity: usize,
        ttl_secs: u64,
    ) -> (ExpiringCache<&'static str, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ExpiringCache::new(
            "test",
            capacity,
            Duration::from_secs(ttl_secs),
            clock.clone(),
        );
        (cache, clock)
    }

    #[test]
    fn expiring_cache_evicts_oldest_inserted_even_if_recently_read() {
        let (cache, _clock) = expiring(2, 600);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // A read must not protect "a": eviction follows insertion order.
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn expiring_cache_treats_old_entries_as_absent() {
        let (cache, clock) = expiring(4, 600);
        cache.insert("a", 1);

        clock.advance(Duration::from_secs(600));
        assert_eq!(cache.get(&"a"), Some(1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expiring_cache_reinsert_restarts_age() {
        let (cache, clock) = expiring(4, 10);
        cache.insert("a", 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("a", 2);
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get(&"a"), Some(2));
    }

    #[test]
    fn purge_expired_stops_at_first_live_entry() {
        let (cache, clock) = expiring(8, 10);
        cache.insert("old-1", 1);
        cache.insert("old-2", 2);
        clock.advance(Duration::from_secs(6));
        cache.insert("fresh", 3);
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"fresh"), Some(3));
    }

    #[test]
    fn capacity_one_holds_a_single_slot() {
        let (cache, _clock) = expiring(1, 600);
        cache.insert("week", 1);
        cache.insert("day", 2);
        assert_eq!(cache.get(&"week"), None);
        assert_eq!(cache.get(&"day"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn update_skips_expired_entries() {
        let (cache, clock) = expiring(4, 10);
        cache.insert("a", 1);
        assert!(cache.update(&"a", |v| *v += 10));
        assert_eq!(cache.get(&"a"), Some(11));

        clock.advance(Duration::from_secs(11));
        assert!(!cache.update(&"a", |v| *v += 10));
    }

    #[test]
    fn recency_cache_evicts_least_recently_used() {
        let cache = RecencyCache::new("test", 2);
        cache.insert(1u64, "one");
        cache.insert(2u64, "two");

        // Touching 1 makes 2 the eviction candidate.
        assert_eq!(cache.get(&1), Some("one"));
        cache.insert(3, "three");

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("one"));
        assert_eq!(cache.get(&3), Some("three"));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn recency_cache_replacing_a_key_does_not_evict() {
        let cache = RecencyCache::new("test", 2);
        cache.insert(1u64, 1);
        cache.insert(2u64, 2);
        cache.insert(2u64, 20);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.metrics().evictions, 0);
    }

    #[test]
    fn update_all_touches_every_entry() {
        let cache = RecencyCache::new("test", 4);
        cache.insert(1u64, vec![1]);
        cache.insert(2u64, vec![2]);
        cache.update_all(|list| list.push(0));
        assert_eq!(cache.get(&1), Some(vec![1, 0]));
        assert_eq!(cache.get(&2), Some(vec![2, 0]));
    }

    #[tokio::test]
    async fn get_or_try_compute_only_computes_on_miss() {
        let (cache, _clock) = expiring(4, 600);
        let mut calls = 0;

        let first: Result<u32, ()> = get_or_try_compute(&cache, "a", || {
            calls += 1;
            async { Ok(7) }
        })
        .await;
        let second: Result<u32, ()> = get_or_try_compute(&cache, "a", || {
            calls += 1;
            async { Ok(8) }
        })
        .await;

        assert_eq!(first, Ok(7));
        assert_eq!(second, Ok(7));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn get_or_try_compute_stores_nothing_on_error() {
        let (cache, _clock) = expiring(4, 600);
        let result: Result<u32, &str> =
            get_or_try_compute(&cache, "a", || async { Err("boom") }).await;
        assert_eq!(result, Err("boom"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn hit_rate_counts_hits_and_misses() {
        let cache = RecencyCache::new("test", 2);
        cache.insert(1u64, 1);
        cache.get(&1);
        cache.get(&2);
        assert_eq!(cache.metrics().hit_rate(), 0.5);
    }
}
