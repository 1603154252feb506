//! File-backed key/value cache with TTL staleness.
//!
//! One JSON file per key. Entry age comes from the file's modification time;
//! stale entries are ignored and eventually overwritten, never purged. Every
//! I/O failure degrades to a cache miss.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::{fs, path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: Option<PathBuf>,
}

impl CacheStore {
    /// Cache rooted at `dir`, created if missing. If it cannot be created every
    /// read misses and every write is dropped.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dir = dir.and_then(|dir| match fs::create_dir_all(&dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                tracing::warn!("Cache directory {} unavailable: {}", dir.display(), e);
                None
            }
        });

        Self { dir }
    }

    #[cfg(test)]
    pub(crate) fn disabled() -> Self {
        Self { dir: None }
    }

    #[cfg(test)]
    pub(crate) fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{key}.json")))
    }

    /// Payload stored under `key`, unless absent, unreadable or older than `ttl`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        self.get_at(key, ttl, Utc::now())
    }

    /// Same as [`CacheStore::get`] with an explicit notion of "now".
    pub fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let written_at = self.written_at(key)?;
        let ttl = chrono::Duration::from_std(ttl).ok()?;

        if now - written_at > ttl {
            tracing::debug!("Cache entry {} is stale", key);
            return None;
        }

        let raw = fs::read_to_string(self.path(key)?).ok()?;
        match serde_json::from_str(&raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::debug!("Cache entry {} is not usable: {}", key, e);
                None
            }
        }
    }

    /// Best effort: failures are logged and otherwise ignored.
    pub fn put<T: Serialize>(&self, key: &str, payload: &T) {
        let Some(path) = self.path(key) else {
            return;
        };

        let json = match serde_json::to_string_pretty(payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = fs::write(&path, json) {
            tracing::warn!("Failed to write cache entry {}: {}", path.display(), e);
        }
    }

    /// Modification time of the entry for `key`.
    pub fn written_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.path(key)?).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Raw file contents for `key`, regardless of age.
    #[cfg(test)]
    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)?).ok()
    }
}
