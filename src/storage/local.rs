//! Local filesystem cache backend.
//!
//! ## Features
//!
//! - **Atomic writes**: files are written to `*.tmp` and renamed into place
//! - **Get-or-fetch**: cache check and populate run under a per-key lock, so
//!   two units never fetch or write the same file at once
//! - **Corruption recovery**: an unreadable entry is treated as a miss

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::Cached;

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Whether an entry exists under the key.
    pub async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.path(key)).await.unwrap_or(false)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write pretty-printed JSON.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Write compact JSON.
    pub async fn write_json_compact<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::cache_read(&path, e)),
        }
    }

    /// Read JSON data; a file that does not parse is a `CacheRead` error.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| AppError::cache_read(&self.path(key), e)),
            None => Ok(None),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key.to_string()).or_default().value())
    }

    /// Drop the key's lock once no other caller holds or awaits it.
    fn release(&self, key: &str) {
        // One reference in the map, one held by the caller.
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 2);
    }

    /// Return the cached value under `key`, or run `fetch` and cache its result.
    ///
    /// With `force` set the existing entry is ignored and overwritten. The
    /// whole check-fetch-write sequence holds the key's lock. A fetch error
    /// leaves the cache untouched. A leftover `*.tmp` from an interrupted
    /// write is not an entry and gets overwritten by the next write.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, force: bool, fetch: F) -> Result<Cached<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let lock = self.lock_for(key);
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(key, force, fetch).await
        };
        self.release(key);
        result
    }

    async fn fetch_locked<T, F, Fut>(&self, key: &str, force: bool, fetch: F) -> Result<Cached<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !force {
            match self.read_json::<T>(key).await {
                Ok(Some(value)) => return Ok(Cached::Hit(value)),
                Ok(None) => {}
                Err(e) => log::warn!("{e}; fetching again"),
            }
        }

        let value = fetch().await?;
        self.write_json(key, &value).await?;
        Ok(Cached::Fetched(value))
    }
}
