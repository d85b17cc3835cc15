use std::future::Future;
use std::time::Duration;
use tenantsync_core::error::{Result, TenantSyncError};
use tenantsync_core::upstream::RemoteError;

use super::cache::FetchCache;
use super::policy::RetryPolicy;

/// Where a fetched value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Fetched from the upstream by this call.
    Fresh,
    /// Served from a live cache entry.
    Cached,
    /// Upstream failed; served from an expired entry.
    Stale,
}

impl FetchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Cached => "cached",
            Self::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<V> {
    pub value: V,
    pub source: FetchSource,
}

/// Per-call knobs. Defaults come from the fetcher.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub ttl: Option<Duration>,
    pub retry: Option<RetryPolicy>,
    /// Evict before reading so the upstream is always called.
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }
}

/// TTL cache in front of a throttled upstream.
///
/// One instance is built at startup and shared by every read path that
/// crosses a rate-limited boundary. Keys must be scoped by the caller
/// (acting identity included) so one tenant never sees another's cached read.
pub struct CachedFetcher<V> {
    cache: FetchCache<V>,
    ttl: Duration,
    retry: RetryPolicy,
}

impl<V: Clone + Send + Sync> CachedFetcher<V> {
    pub fn new(ttl: Duration, retry: RetryPolicy) -> Self {
        Self {
            cache: FetchCache::new(),
            ttl,
            retry,
        }
    }

    /// Keeps expired values as a stale fallback for at most `max_stale`.
    pub fn with_max_stale(mut self, max_stale: Duration) -> Self {
        self.cache = FetchCache::with_max_stale(max_stale);
        self
    }

    pub fn cache(&self) -> &FetchCache<V> {
        &self.cache
    }

    /// Returns the cached value for `key` or calls `remote`.
    ///
    /// Throttled calls sleep for the declared wait (up to the policy cap) and
    /// retry; transient failures back off linearly. When retries run out the
    /// last cached value is returned as [`FetchSource::Stale`], if any.
    /// Not-found and permanent rejections are returned as-is.
    pub async fn fetch_cached<F, Fut>(
        &self,
        key: &str,
        options: FetchOptions,
        mut remote: F,
    ) -> Result<Fetched<V>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<V, RemoteError>>,
    {
        if options.force_refresh {
            self.cache.evict(key).await;
        } else if let Some(value) = self.cache.get_fresh(key).await {
            tracing::debug!("[CachedFetcher] Cache hit: {}", key);
            return Ok(Fetched {
                value,
                source: FetchSource::Cached,
            });
        }

        let ttl = options.ttl.unwrap_or(self.ttl);
        let retry = options.retry.as_ref().unwrap_or(&self.retry);

        let mut attempt = 1;
        let error = loop {
            match remote().await {
                Ok(value) => {
                    self.cache.insert(key, value.clone(), ttl).await;
                    return Ok(Fetched {
                        value,
                        source: FetchSource::Fresh,
                    });
                }
                Err(err @ (RemoteError::NotFound(_) | RemoteError::Permanent(_))) => {
                    return Err(err.into());
                }
                Err(err) => match retry.delay_after(attempt, &err) {
                    Some(delay) => {
                        tracing::debug!(
                            "[CachedFetcher] Attempt {} for {} failed ({}), retrying in {:?}",
                            attempt,
                            key,
                            err,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => break err,
                },
            }
        };

        self.fall_back(key, attempt, error).await
    }

    async fn fall_back(&self, key: &str, attempts: u32, error: RemoteError) -> Result<Fetched<V>> {
        match self.cache.get_any(key).await {
            Some(value) => {
                tracing::warn!(
                    "[CachedFetcher] Upstream failed after {} attempt(s) for {} ({}), \
                     serving stale value",
                    attempts,
                    key,
                    error
                );
                Ok(Fetched {
                    value,
                    source: FetchSource::Stale,
                })
            }
            None => {
                tracing::warn!(
                    "[CachedFetcher] Upstream failed after {} attempt(s) for {}: {}",
                    attempts,
                    key,
                    error
                );
                Err(TenantSyncError::from(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Upstream that plays back scripted responses and counts calls.
    struct ScriptedRemote {
        responses: Mutex<VecDeque<std::result::Result<u32, RemoteError>>>,
        calls: AtomicU32,
    }

    impl ScriptedRemote {
        fn new(responses: Vec<std::result::Result<u32, RemoteError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            }
        }

        async fn call(&self) -> std::result::Result<u32, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(RemoteError::Permanent("script exhausted".into())))
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn fetcher() -> CachedFetcher<u32> {
        CachedFetcher::new(Duration::from_secs(60), RetryPolicy::default())
    }

    fn throttled(secs: u64) -> std::result::Result<u32, RemoteError> {
        Err(RemoteError::Throttled {
            retry_after: Duration::from_secs(secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_reads_within_ttl_call_once() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![Ok(1), Ok(2)]);

        let first = fetcher
            .fetch_cached("u1:E1:roles", FetchOptions::default(), || remote.call())
            .await
            .unwrap();
        let second = fetcher
            .fetch_cached("u1:E1:roles", FetchOptions::default(), || remote.call())
            .await
            .unwrap();

        assert_eq!(first.source, FetchSource::Fresh);
        assert_eq!(second, Fetched { value: 1, source: FetchSource::Cached });
        assert_eq!(remote.calls(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = fetcher
            .fetch_cached("u1:E1:roles", FetchOptions::default(), || remote.call())
            .await
            .unwrap();
        assert_eq!(third, Fetched { value: 2, source: FetchSource::Fresh });
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_refresh_evicts_first() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![Ok(1), Ok(2)]);

        fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap();
        let refreshed = fetcher
            .fetch_cached("k", FetchOptions::refresh(), || remote.call())
            .await
            .unwrap();

        assert_eq!(refreshed.value, 2);
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_isolated() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![Ok(1), Ok(2)]);

        let a = fetcher
            .fetch_cached("alice:E1:roles", FetchOptions::default(), || remote.call())
            .await
            .unwrap();
        let b = fetcher
            .fetch_cached("bob:E1:roles", FetchOptions::default(), || remote.call())
            .await
            .unwrap();

        assert_eq!((a.value, b.value), (1, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_within_cap_sleeps_and_retries() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![throttled(10), Ok(7)]);

        let started = tokio::time::Instant::now();
        let fetched = fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap();

        assert_eq!(fetched.value, 7);
        assert_eq!(remote.calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_over_cap_fails_fast_without_cache() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![throttled(600)]);

        let started = tokio::time::Instant::now();
        let err = fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap_err();

        assert!(err.is_throttled());
        assert_eq!(remote.calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_over_cap_serves_last_good_value() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![Ok(42), throttled(600)]);

        fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(120)).await;

        let started = tokio::time::Instant::now();
        let fetched = fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap();

        assert_eq!(fetched, Fetched { value: 42, source: FetchSource::Stale });
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fallback_ends_after_retention() {
        let fetcher = fetcher().with_max_stale(Duration::from_secs(600));
        let remote = ScriptedRemote::new(vec![Ok(42), throttled(900)]);

        fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(60 + 600)).await;

        let err = fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap_err();
        assert!(err.is_throttled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_back_off_linearly_then_give_up() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![
            Err(RemoteError::Transient("502".into())),
            Err(RemoteError::Transient("502".into())),
            Err(RemoteError::Transient("502".into())),
        ]);

        let started = tokio::time::Instant::now();
        let err = fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
        assert_eq!(remote.calls(), 3);
        // 1s after the first failure, 2s after the second
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_masked_by_cache() {
        let fetcher = fetcher();
        let remote = ScriptedRemote::new(vec![Ok(1), Err(RemoteError::NotFound("gone".into()))]);

        fetcher
            .fetch_cached("k", FetchOptions::default(), || remote.call())
            .await
            .unwrap();
        let err = fetcher
            .fetch_cached("k", FetchOptions::refresh(), || remote.call())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(remote.calls(), 2);
    }
}
