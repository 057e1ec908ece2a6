use moka::future::Cache;
use moka::policy::EvictionPolicy;
use moka::Expiry;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::cache::CacheKey;
use crate::error::{FlightError, FlightResult};

/// An immutable cached value together with its creation time and TTL
#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Expires each entry after the TTL it was stored with
struct PerEntryTtl;

impl<V> Expiry<CacheKey, Arc<CacheEntry<V>>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &Arc<CacheEntry<V>>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Request-deduplicating TTL cache for upstream query results.
///
/// Backed by a Moka cache with LRU eviction. Concurrent misses on one key are
/// collapsed into a single fetch by `try_get_with`, which coordinates per key
/// so unrelated keys never wait on each other. Failed fetches are not stored.
#[derive(Clone)]
pub struct QueryCache<V> {
    entries: Cache<CacheKey, Arc<CacheEntry<V>>>,
    capacity: u64,
    default_ttl: Duration,
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64, default_ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(PerEntryTtl)
            .build();

        Self {
            entries,
            capacity,
            default_ttl,
        }
    }

    /// Return the live value for `key`, or run `fetch` once to produce it.
    ///
    /// Every caller that misses on `key` while a fetch is in flight receives
    /// that fetch's outcome, error included. `ttl` overrides the default TTL
    /// for the stored entry.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
        ttl: Option<Duration>,
    ) -> FlightResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult<V>>,
    {
        if let Some(entry) = self.entries.get(key).await {
            debug!(key = %key.fingerprint(), age_ms = entry.age().as_millis() as u64, "cache hit");
            return Ok(entry.value.clone());
        }

        let ttl = ttl.unwrap_or(self.default_ttl);
        let fingerprint = key.fingerprint();
        let init = async move {
            debug!(key = %fingerprint, "cache miss, fetching from upstream");
            let value = fetch().await?;
            Ok::<_, FlightError>(Arc::new(CacheEntry::new(value, ttl)))
        };

        self.entries
            .try_get_with(key.clone(), init)
            .await
            .map(|entry| entry.value.clone())
            .map_err(Arc::unwrap_or_clone)
    }

    /// Return the live value for `key` without fetching
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        self.entries.get(key).await.map(|entry| entry.value.clone())
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key).await;
    }

    /// Drop every entry. The cache stays usable afterwards.
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Remove expired entries and apply pending evictions now
    pub async fn sweep(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Number of live entries, after applying pending maintenance
    pub async fn size(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(name: &str) -> CacheKey {
        CacheKey::new("flights", [("flight_iata", name)])
    }

    fn counted(
        calls: &Arc<AtomicUsize>,
        result: FlightResult<u32>,
    ) -> impl FnOnce() -> std::future::Ready<FlightResult<u32>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result)
        }
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let cache: QueryCache<u32> = QueryCache::new(10, Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let value = cache
                .get_or_fetch(&key("AA100"), counted(&calls, Ok(7)), None)
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.size().await, 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache: QueryCache<u32> = QueryCache::new(10, Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_fetch(
                &key("AA100"),
                counted(&calls, Err(FlightError::upstream(Some(500), "boom"))),
                None,
            )
            .await;
        assert!(matches!(first, Err(FlightError::Upstream { status: Some(500), .. })));
        assert_eq!(cache.size().await, 0);

        let second = cache
            .get_or_fetch(&key("AA100"), counted(&calls, Ok(3)), None)
            .await
            .unwrap();
        assert_eq!(second, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_introspection_and_clear() {
        let cache: QueryCache<u32> = QueryCache::new(25, Duration::from_secs(90));
        assert_eq!(cache.capacity(), 25);
        assert_eq!(cache.default_ttl(), Duration::from_secs(90));

        cache
            .get_or_fetch(&key("AA1"), || async { Ok(1) }, None)
            .await
            .unwrap();
        cache
            .get_or_fetch(&key("AA2"), || async { Ok(2) }, None)
            .await
            .unwrap();
        assert_eq!(cache.size().await, 2);

        cache.invalidate(&key("AA1")).await;
        assert!(cache.get(&key("AA1")).await.is_none());

        cache.clear().await;
        assert_eq!(cache.size().await, 0);
    }
}
