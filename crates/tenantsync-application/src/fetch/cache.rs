use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// How long an expired entry stays around as a stale fallback by default.
pub const DEFAULT_MAX_STALE: Duration = Duration::from_secs(3600);

/// Minimum gap between two sweeps of dead entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// A fetched value with its freshness window.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.fetched_at) < self.ttl
    }

    /// Still usable as a stale fallback at `now`.
    pub fn is_retained(&self, now: Instant, max_stale: Duration) -> bool {
        now.duration_since(self.fetched_at) < self.ttl.saturating_add(max_stale)
    }
}

struct Entries<V> {
    map: HashMap<String, CacheEntry<V>>,
    next_sweep: Instant,
}

/// Keyed cache of upstream results.
///
/// Expired entries are kept for `max_stale` past their TTL: they serve as
/// the stale fallback when the upstream keeps failing. Entries older than
/// that are dropped by a sweep that runs on insert, so keys scoped per actor
/// cannot pile up forever.
pub struct FetchCache<V> {
    entries: RwLock<Entries<V>>,
    max_stale: Duration,
}

impl<V> Default for FetchCache<V> {
    fn default() -> Self {
        Self::with_max_stale(DEFAULT_MAX_STALE)
    }
}

impl<V> FetchCache<V> {
    pub fn with_max_stale(max_stale: Duration) -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                next_sweep: Instant::now() + SWEEP_INTERVAL,
            }),
            max_stale,
        }
    }

    pub fn max_stale(&self) -> Duration {
        self.max_stale
    }
}

impl<V: Clone> FetchCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value if its TTL has not elapsed.
    pub async fn get_fresh(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .map
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.value.clone())
    }

    /// Returns the value if it is fresh or still within the stale window.
    pub async fn get_any(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .map
            .get(key)
            .filter(|entry| entry.is_retained(now, self.max_stale))
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if now >= entries.next_sweep {
            let before = entries.map.len();
            let max_stale = self.max_stale;
            entries
                .map
                .retain(|_, entry| entry.is_retained(now, max_stale));
            entries.next_sweep = now + SWEEP_INTERVAL;
            let dropped = before - entries.map.len();
            if dropped > 0 {
                tracing::debug!("[FetchCache] Swept {} dead entries", dropped);
            }
        }

        entries.map.insert(
            key.into(),
            CacheEntry {
                value,
                fetched_at: now,
                ttl,
            },
        );
    }

    pub async fn evict(&self, key: &str) -> bool {
        self.entries.write().await.map.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.map.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_but_stays_available() {
        let cache = FetchCache::new();
        cache.insert("k", 1u32, Duration::from_secs(60)).await;

        assert_eq!(cache.get_fresh("k").await, Some(1));
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get_fresh("k").await, None);
        assert_eq!(cache.get_any("k").await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_window_ends() {
        let cache = FetchCache::with_max_stale(Duration::from_secs(300));
        cache.insert("k", 1u32, Duration::from_secs(60)).await;

        tokio::time::advance(Duration::from_secs(359)).await;
        assert_eq!(cache.get_any("k").await, Some(1));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get_any("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_actor_keys_are_swept_on_insert() {
        let cache = FetchCache::with_max_stale(Duration::from_secs(300));
        for actor in 0..1000 {
            let key = format!("actor-{}:E1:roles", actor);
            cache.insert(key, actor, Duration::from_secs(60)).await;
        }
        assert_eq!(cache.len().await, 1000);

        // Inside the stale window nothing is dropped
        tokio::time::advance(Duration::from_secs(120)).await;
        cache.insert("actor-new:E1:roles", 0, Duration::from_secs(60)).await;
        assert_eq!(cache.len().await, 1001);

        tokio::time::advance(Duration::from_secs(300)).await;
        cache.insert("actor-late:E1:roles", 0, Duration::from_secs(60)).await;

        // Only the two recent inserts survive
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get_any("actor-late:E1:roles").await, Some(0));
        assert_eq!(cache.get_any("actor-7:E1:roles").await, None);
    }

    #[tokio::test]
    async fn test_evict_and_clear() {
        let cache = FetchCache::new();
        cache.insert("a", "x".to_string(), Duration::from_secs(60)).await;
        cache.insert("b", "y".to_string(), Duration::from_secs(60)).await;

        assert!(cache.evict("a").await);
        assert!(!cache.evict("a").await);
        assert_eq!(cache.len().await, 1);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
