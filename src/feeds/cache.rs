// src/feeds/cache.rs
//! Freshness cache: a single named slot holding the last aggregate, with a
//! fixed TTL evaluated lazily on read.

use chrono::{DateTime, Utc};
use metrics::counter;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::feeds::error::CacheError;
use crate::feeds::types::{AggregateFeedResult, CachedPayload};

pub const CACHE_KEY: &str = "learningos_feeds_cache";
/// 15 minutes.
pub const CACHE_TTL_SECS: i64 = 15 * 60;

/// Synchronous string key-value storage.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local store; used in tests and when no cache dir is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.map().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.map().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.map().remove(key);
        Ok(())
    }
}

/// One JSON file per key under `dir`. Writes go through a temp file + rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn KvStore>,
    key: String,
    ttl_secs: i64,
}

impl FeedCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            key: CACHE_KEY.to_string(),
            ttl_secs: CACHE_TTL_SECS,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn read(&self) -> Option<CachedPayload> {
        self.read_at(Utc::now())
    }

    /// Fails closed: unreadable, unparseable or expired entries are a miss,
    /// and the latter two are deleted on the spot.
    pub fn read_at(&self, now: DateTime<Utc>) -> Option<CachedPayload> {
        let hit = match self.store.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<CachedPayload>(&raw) {
                Ok(p) if self.expired(&p, now) => {
                    self.evict("expired");
                    None
                }
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(error = %e, "feed cache entry unparseable");
                    self.evict("corrupt");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "feed cache read failed");
                None
            }
        };

        if hit.is_some() {
            counter!("feed_cache_hits_total").increment(1);
        } else {
            counter!("feed_cache_misses_total").increment(1);
        }
        hit
    }

    pub fn write(&self, result: &AggregateFeedResult) -> Result<(), CacheError> {
        self.write_at(result, Utc::now())
    }

    pub fn write_at(
        &self,
        result: &AggregateFeedResult,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let payload = CachedPayload {
            data: result.clone(),
            cached_at: now,
        };
        let json = serde_json::to_string(&payload)?;
        self.store.set(&self.key, &json)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Absent or unparseable counts as expired. Does not evict.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.peek().map_or(true, |p| self.expired(&p, now))
    }

    pub fn age_seconds(&self) -> Option<i64> {
        self.age_seconds_at(Utc::now())
    }

    pub fn age_seconds_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.peek().map(|p| (now - p.cached_at).num_seconds())
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.store.delete(&self.key)
    }

    fn expired(&self, p: &CachedPayload, now: DateTime<Utc>) -> bool {
        now - p.cached_at > chrono::Duration::seconds(self.ttl_secs)
    }

    fn peek(&self) -> Option<CachedPayload> {
        let raw = self.store.get(&self.key).ok()??;
        serde_json::from_str(&raw).ok()
    }

    fn evict(&self, why: &str) {
        if let Err(e) = self.store.delete(&self.key) {
            warn!(error = %e, reason = why, "feed cache eviction failed");
        }
    }
}
