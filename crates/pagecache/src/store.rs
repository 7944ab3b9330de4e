//! Store boundary: async key-value operations and the embedded adapter

use std::time::Duration;

use async_trait::async_trait;
use pagestore::PageStore;

use crate::error::Result;

/// Async boundary over the backing key-value store.
///
/// `increment` must be atomic under concurrent callers; `get` must never
/// return a value at or past its expiry deadline. Both guarantees belong to
/// the store, the cache core only issues the calls.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically add one to the integer at `key`, creating it at 0 if
    /// absent, and return the new value
    async fn increment(&self, key: &str) -> Result<u64>;

    /// Current value at `key`, or `None` if missing or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key`, overwriting any prior value, expiring `ttl`
    /// from now
    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
}

/// Embedded store adapter over [`pagestore::PageStore`].
///
/// Never reports `StoreUnavailable` or `StoreTimeout`; engine rejections
/// surface as `Error::Store`.
pub struct MemoryStore {
    inner: PageStore,
}

impl MemoryStore {
    /// Create an adapter over a fresh empty store
    pub fn new() -> Self {
        Self {
            inner: PageStore::new(),
        }
    }

    /// Access the underlying engine for housekeeping or introspection
    pub fn engine(&self) -> &PageStore {
        &self.inner
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn increment(&self, key: &str) -> Result<u64> {
        Ok(self.inner.increment(key)?)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key))
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        Ok(self.inner.set_with_expiry(key, value, ttl)?)
    }
}
