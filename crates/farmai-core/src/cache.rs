//! In-memory TTL cache for normalized provider responses.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::{Clock, SystemClock};
use crate::data_source::UseCase;

/// TTL applied when a caller passes no TTL or a zero TTL.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3_600);

/// Namespaced cache key. The first segment is always the use-case prefix,
/// so keys of different use cases never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(use_case: UseCase) -> Self {
        Self(use_case.cache_prefix().to_owned())
    }

    pub fn with(mut self, part: impl Display) -> Self {
        self.0.push(':');
        self.0.push_str(&part.to_string());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hit/miss counters and the current number of stored keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: OffsetDateTime,
}

impl CacheEntry {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
struct CacheInner {
    map: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Thread-safe in-memory cache. Clones share the same storage.
///
/// Reads check expiry themselves, so an entry is never returned once its TTL
/// has elapsed; [`CacheStore::purge_expired`] only reclaims memory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<CacheInner>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl CacheStore {
    /// Create a cache store with the given default TTL and the system clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let default_ttl = if default_ttl.is_zero() {
            DEFAULT_TTL
        } else {
            default_ttl
        };

        Self {
            inner: Arc::new(CacheInner {
                map: RwLock::new(HashMap::new()),
                default_ttl,
                clock,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.clock)
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Get the value for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.inner.clock.now();
        let value = {
            let map = self.inner.map.read().unwrap_or_else(PoisonError::into_inner);
            map.get(key)
                .filter(|entry| entry.is_live(now))
                .map(|entry| entry.value.clone())
        };

        let counter = if value.is_some() {
            &self.inner.hits
        } else {
            &self.inner.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);

        value
    }

    /// Store `value` under `key`, replacing any previous entry and restarting its TTL.
    ///
    /// `None` or a zero TTL falls back to the store's default TTL.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) {
        let ttl = ttl
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.inner.default_ttl);
        let entry = CacheEntry {
            value: value.into(),
            expires_at: self.inner.clock.now() + ttl,
        };

        self.inner
            .map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), entry);
    }

    /// Remove `key`. Returns whether an entry (expired or not) was present.
    pub fn delete(&self, key: &str) -> bool {
        self.inner
            .map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Remove every entry.
    pub fn flush(&self) {
        self.inner
            .map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Remove expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let mut map = self.inner.map.write().unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        before - map.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            keys: self.len(),
        }
    }
}
