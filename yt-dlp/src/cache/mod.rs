//! Cache module for storing media records until their direct URL expires.
//!
//! Records are keyed by [`cache_key`], the SHA-256 of the page URL, and carry their own
//! expiry. A store never hands out an entry past that expiry.

use crate::error::{Error, Result};
use crate::model::MediaRecord;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

#[cfg(feature = "cache")]
mod sqlite;
#[cfg(feature = "cache")]
pub use sqlite::SqliteCache;

/// Computes the cache key of a page URL.
pub fn cache_key(page_url: impl AsRef<str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(page_url.as_ref().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A key-value store with a per-entry expiry.
pub trait CacheStore: fmt::Debug + Send + Sync {
    /// Returns the record stored under the key, unless it has expired.
    fn get(&self, key: &str) -> Option<MediaRecord>;

    /// Stores a record until the given time.
    ///
    /// # Errors
    ///
    /// This function will return an error if the record could not be written.
    fn put(&self, key: &str, record: &MediaRecord, expires_at: DateTime<Utc>) -> Result<()>;

    /// Removes a record.
    fn remove(&self, key: &str) -> Result<()>;

    /// Removes every expired record and returns how many were removed.
    fn clean(&self) -> Result<usize>;
}

/// A cache entry held in memory.
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    record: MediaRecord,
    expires_at: DateTime<Utc>,
}

/// An in-process cache store.
///
/// Expired entries are pruned on every write.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".to_string()))
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<MediaRecord> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Looking for media record in cache: {}", key);

        let mut entries = self.lock().ok()?;
        let entry = entries.get(key)?;

        if entry.expires_at > Utc::now() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Cache hit for media record: {}", key);

            return Some(entry.record.clone());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Cache expired for media record: {}", key);

        entries.remove(key);
        None
    }

    fn put(&self, key: &str, record: &MediaRecord, expires_at: DateTime<Utc>) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Caching media record {} until {}", key, expires_at);

        let now = Utc::now();
        let mut entries = self.lock()?;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clean(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}
