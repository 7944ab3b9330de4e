//! Keyed byte store with per-entry expiry
//!
//! All entries live in one locked map. Cache entries carry a deadline and
//! are evicted lazily when a reader touches them; counter entries have no
//! deadline and survive until the store is dropped.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ahash::RandomState;
use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Maximum value size (1 MB)
const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Stored value plus its optional expiry deadline
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

/// PageStore is the shared key-value store handle
pub struct PageStore {
    entries: RwLock<HashMap<String, Entry, RandomState>>,
}

impl PageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    /// Get the value at `key`, or `None` if missing or expired.
    ///
    /// An entry is expired once its deadline is reached; expired entries
    /// are removed on access so a read never observes one.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Store `value` at `key` with no expiry, overwriting any prior value
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.insert(key, value, None)
    }

    /// Store `value` at `key`, overwriting any prior value, expiring `ttl`
    /// from now
    pub fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.insert(key, value, Some(Instant::now() + ttl))
    }

    fn insert(&self, key: &str, value: &[u8], expires_at: Option<Instant>) -> Result<()> {
        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLarge(value.len()));
        }

        let mut entries = self.entries.write();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );

        Ok(())
    }

    /// Atomically add one to the integer at `key`, creating it at 0 if the
    /// key is absent or expired, and return the new value.
    ///
    /// The entry's expiry, if any, is left untouched. Fails with
    /// [`Error::NotAnInteger`] if the key holds a non-integer value.
    pub fn increment(&self, key: &str) -> Result<u64> {
        let mut entries = self.entries.write();

        if let Some(entry) = entries.get(key) {
            if entry.is_expired(Instant::now()) {
                entries.remove(key);
            }
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: b"0".to_vec(),
            expires_at: None,
        });

        let current: u64 = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::NotAnInteger(key.to_string()))?;

        let next = current + 1;
        entry.value = next.to_string().into_bytes();

        Ok(next)
    }

    /// Drop every expired entry
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, entry| !entry.is_expired(now));
    }

    /// Number of entries currently held (may include not-yet-evicted
    /// expired ones)
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for PageStore {
    fn default() -> Self {
        Self::new()
    }
}
