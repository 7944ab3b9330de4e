//! Fetch-through page cache with per-URL access counting

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::stats::CacheStats;
use crate::store::KeyValueStore;
use crate::DEFAULT_TTL;

/// Key prefix for access counters
const COUNT_PREFIX: &str = "count:";

/// Key prefix for cached content.
///
/// Content gets its own prefix so counter keys and content keys stay
/// disjoint for every URL, including URLs that themselves start with
/// `count:`.
const PAGE_PREFIX: &str = "page:";

/// Counting fetch-through cache over a shared key-value store.
///
/// Every `get_page` call bumps the URL's access counter, then serves from
/// cache when a fresh entry exists and fetches otherwise. Concurrent misses
/// for one URL may fetch redundantly; wrap the fetcher in
/// [`SingleFlight`](crate::SingleFlight) to collapse them.
pub struct PageCache {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn Fetcher>,
    ttl: Duration,
    stats: CacheStats,
}

impl PageCache {
    /// Create a cache over the given store and fetcher with the default
    /// 10 second entry lifetime
    pub fn new(store: Arc<dyn KeyValueStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            ttl: DEFAULT_TTL,
            stats: CacheStats::new(),
        }
    }

    /// Replace the per-instance entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Content at `url`: cached if fresh, fetched and stored otherwise.
    ///
    /// The access counter bumps exactly once per call, before the cache
    /// check, whether the call hits, misses, or the fetch fails. A failed
    /// fetch writes nothing to the cache, propagates to the caller, and the
    /// increment stands.
    pub async fn get_page(&self, url: &str) -> Result<Vec<u8>> {
        self.get_page_with_ttl(url, self.ttl).await
    }

    /// Same as [`get_page`](Self::get_page), with an explicit lifetime for
    /// a newly stored entry
    pub async fn get_page_with_ttl(&self, url: &str, ttl: Duration) -> Result<Vec<u8>> {
        self.store.increment(&count_key(url)).await?;

        if let Some(content) = self.store.get(&page_key(url)).await? {
            self.stats.record_hit();
            return Ok(content);
        }
        self.stats.record_miss();

        let content = match self.fetcher.fetch(url).await {
            Ok(content) => content,
            Err(err) => {
                self.stats.record_fetch_failure();
                return Err(err);
            }
        };

        self.store.set_with_expiry(&page_key(url), &content, ttl).await?;

        Ok(content)
    }

    /// Times `url` has been requested through [`get_page`](Self::get_page).
    ///
    /// A URL never requested reads as 0, not an error.
    pub async fn get_count(&self, url: &str) -> Result<u64> {
        match self.store.get(&count_key(url)).await? {
            Some(raw) => parse_count(url, &raw),
            None => Ok(0),
        }
    }

    /// Cache behavior statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

fn count_key(url: &str) -> String {
    format!("{}{}", COUNT_PREFIX, url)
}

fn page_key(url: &str) -> String {
    format!("{}{}", PAGE_PREFIX, url)
}

fn parse_count(url: &str, raw: &[u8]) -> Result<u64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("counter for '{}' is not an integer", url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new(body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    struct FailingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Fetch {
                status: Some(503),
                message: "unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_count_zero_before_any_access() {
        let cache = PageCache::new(
            Arc::new(MemoryStore::new()),
            CountingFetcher::new(b"HELLO"),
        );

        assert_eq!(cache.get_count("http://example.test/a").await.unwrap(), 0);
        assert_eq!(cache.get_count("http://example.test/a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_then_hit() {
        let fetcher = CountingFetcher::new(b"HELLO");
        let cache = PageCache::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );
        let url = "http://example.test/a";

        assert_eq!(cache.get_page(url).await.unwrap(), b"HELLO");
        assert_eq!(cache.get_count(url).await.unwrap(), 1);

        // Within the TTL: identical content, no second fetch
        assert_eq!(cache.get_page(url).await.unwrap(), b"HELLO");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.get_count(url).await.unwrap(), 2);

        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hit_ratio(), 0.5);
    }

    #[tokio::test]
    async fn test_counter_counts_every_access() {
        let fetcher = CountingFetcher::new(b"HELLO");
        let cache = PageCache::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );
        let url = "http://example.test/a";

        for _ in 0..5 {
            cache.get_page(url).await.unwrap();
        }

        assert_eq!(cache.get_count(url).await.unwrap(), 5);
        // One miss, four hits
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_counter_counts_failed_fetches_too() {
        let store = Arc::new(MemoryStore::new());
        let url = "http://example.test/a";

        let failing = PageCache::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            Arc::new(FailingFetcher {
                calls: AtomicUsize::new(0),
            }),
        );
        let working = PageCache::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            CountingFetcher::new(b"HELLO"),
        );

        // Mix of failures, misses, and hits against the same store
        assert!(failing.get_page(url).await.is_err());
        assert!(failing.get_page(url).await.is_err());
        working.get_page(url).await.unwrap();
        working.get_page(url).await.unwrap();

        assert_eq!(working.get_count(url).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_expiry_refetches() {
        let fetcher = CountingFetcher::new(b"HELLO");
        let cache = PageCache::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        )
        .with_ttl(Duration::from_millis(30));
        let url = "http://example.test/a";

        cache.get_page(url).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.get_page(url).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.get_count(url).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_per_call_ttl_override() {
        let fetcher = CountingFetcher::new(b"HELLO");
        let cache = PageCache::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );
        let url = "http://example.test/a";

        cache
            .get_page_with_ttl(url, Duration::from_millis(30))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.get_page(url).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_propagates_and_leaves_no_entry() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(FailingFetcher {
            calls: AtomicUsize::new(0),
        });
        let cache = PageCache::new(
            Arc::clone(&store) as Arc<dyn KeyValueStore>,
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );
        let url = "http://example.test/a";

        let err = cache.get_page(url).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch {
                status: Some(503),
                ..
            }
        ));

        // No cache entry was written, the increment stands
        assert_eq!(store.get(&page_key(url)).await.unwrap(), None);
        assert_eq!(cache.get_count(url).await.unwrap(), 1);
        assert_eq!(cache.stats().fetch_failures(), 1);
    }

    #[tokio::test]
    async fn test_counter_and_content_keys_disjoint() {
        let fetcher = CountingFetcher::new(b"PAYLOAD");
        let cache = PageCache::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );

        // A URL that itself starts with the counter prefix
        cache.get_page("count:x").await.unwrap();

        assert_eq!(cache.get_count("count:x").await.unwrap(), 1);
        assert_eq!(cache.get_count("x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oversized_page_fails_to_store() {
        let fetcher = CountingFetcher::new(&vec![b'x'; 1024 * 1024 + 1]);
        let cache = PageCache::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        );
        let url = "http://example.test/huge";

        let err = cache.get_page(url).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));

        // The failed store write does not undo the access count
        assert_eq!(cache.get_count(url).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_access_counts_every_call() {
        let fetcher = CountingFetcher::new(b"HELLO");
        let cache = Arc::new(PageCache::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
        ));
        let url = "http://example.test/a";

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.get_page(url).await.unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), b"HELLO");
        }

        // Every call counted; concurrent misses may have fetched redundantly
        assert_eq!(cache.get_count(url).await.unwrap(), 16);
        assert!(fetcher.calls() >= 1);
    }
}
