//! A cache store persisted in SQLite.

use super::CacheStore;
use crate::error::Result;
use crate::model::MediaRecord;
use crate::utils::file_system;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Cache manager for media records using SQLite.
#[derive(Debug)]
pub struct SqliteCache {
    /// The SQLite connection.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Creates a new cache manager.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - The directory where to store the cache database.
    ///
    /// # Errors
    ///
    /// This function will return an error if the cache directory cannot be created or the database cannot be initialized.
    pub fn new(cache_dir: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Creating new media cache in {:?}", cache_dir);

        file_system::create_dir(cache_dir.as_ref())?;

        let db_path = cache_dir.as_ref().join("media_cache.db");
        let connection = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        connection.execute(
            "CREATE TABLE IF NOT EXISTS media (
                key TEXT PRIMARY KEY,
                record_json TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;

        connection.execute(
            "CREATE INDEX IF NOT EXISTS idx_media_expires_at ON media(expires_at)",
            [],
        )?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| crate::error::Error::Cache("sqlite cache lock poisoned".to_string()))
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &str) -> Option<MediaRecord> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Looking for media record in cache: {}", key);

        let connection = self.connection().ok()?;
        let row: Option<String> = connection
            .query_row(
                "SELECT record_json FROM media WHERE key = ? AND expires_at > ?",
                params![key, Utc::now().timestamp()],
                |row| row.get(0),
            )
            .optional()
            .ok()?;

        let Some(record_json) = row else {
            #[cfg(feature = "tracing")]
            tracing::debug!("Cache miss for media record: {}", key);
            return None;
        };

        match serde_json::from_str(&record_json) {
            Ok(record) => Some(record),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Discarding unreadable cache entry {}: {}", key, _e);
                None
            }
        }
    }

    fn put(&self, key: &str, record: &MediaRecord, expires_at: DateTime<Utc>) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Caching media record {} until {}", key, expires_at);

        let record_json = serde_json::to_string(record)?;
        let connection = self.connection()?;

        connection.execute(
            "INSERT OR REPLACE INTO media (key, record_json, expires_at, cached_at) VALUES (?, ?, ?, ?)",
            params![key, record_json, expires_at.timestamp(), Utc::now().timestamp()],
        )?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Removing media record from cache: {}", key);

        self.connection()?
            .execute("DELETE FROM media WHERE key = ?", params![key])?;
        Ok(())
    }

    fn clean(&self) -> Result<usize> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Cleaning expired media records");

        let removed = self.connection()?.execute(
            "DELETE FROM media WHERE expires_at <= ?",
            params![Utc::now().timestamp()],
        )?;
        Ok(removed)
    }
}
