// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Short-lived TTL cache for idempotent reads.
//!
//! Freshness is checked on every read, so the periodic sweeper only reclaims
//! memory. When full, the cache evicts in insertion order (not LRU).

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Default entry lifetime (5 minutes).
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(5 * 60);
/// Default sweep period for [`TtlCache::spawn_sweeper`].
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub default_ttl: std::time::Duration,
    /// Maximum number of entries; 0 disables the limit
    pub max_size: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_size: 100,
        }
    }
}

/// A cached value with its write time.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub timestamp: DateTime<Utc>,
    pub ttl: Duration,
    seq: u64,
}

impl<V> CacheEntry<V> {
    /// Logically present iff `now - timestamp <= ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) <= self.ttl
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion sequence → key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

impl<V> CacheInner<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }
}

pub struct TtlCache<V> {
    inner: Mutex<CacheInner<V>>,
    options: CacheOptions,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
            }),
            options,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.options.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: std::time::Duration) {
        self.set_at(key, value, ttl, Utc::now());
    }

    /// Store `value` as written at `now`.
    ///
    /// Overwriting an existing key keeps its original insertion position.
    pub fn set_at(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: std::time::Duration,
        now: DateTime<Utc>,
    ) {
        let key = key.into();
        let ttl = to_chrono(ttl);
        let mut inner = self.lock();

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.value = value;
            entry.timestamp = now;
            entry.ttl = ttl;
            return;
        }

        if self.options.max_size > 0 && inner.entries.len() >= self.options.max_size {
            if let Some((_, oldest)) = inner.order.pop_first() {
                inner.entries.remove(&oldest);
                tracing::trace!(key = %oldest, "Cache full, evicted oldest entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                timestamp: now,
                ttl,
                seq,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Value for `key` if still fresh at `now`; stale entries are evicted.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let mut inner = self.lock();

        let fresh = match inner.entries.get(key) {
            Some(entry) => entry.is_fresh_at(now),
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if !fresh {
            inner.remove(key);
            inner.misses += 1;
            return None;
        }

        inner.hits += 1;
        inner.entries.get(key).map(|e| e.value.clone())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Remove every key matching `predicate`. Returns how many were removed.
    pub fn clear_matching(&self, mut predicate: impl FnMut(&str) -> bool) -> usize {
        let mut inner = self.lock();
        let doomed: Vec<String> = inner
            .entries
            .keys()
            .filter(|k| predicate(k))
            .cloned()
            .collect();
        for key in &doomed {
            inner.remove(key);
        }
        doomed.len()
    }

    /// Number of physically stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            size: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    /// Return the cached value, or run `fetch` and cache its success.
    ///
    /// Failures are not cached. Concurrent misses on the same key each run
    /// `fetch`; the last to finish wins.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<std::time::Duration>,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.set_with_ttl(key, value.clone(), ttl.unwrap_or(self.options.default_ttl));
        Ok(value)
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// Physically remove entries that are stale at `now`.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.lock();
        let stale: Vec<String> = inner
            .entries
            .values()
            .filter(|e| !e.is_fresh_at(now))
            .map(|e| e.key.clone())
            .collect();
        for key in &stale {
            inner.remove(key);
        }
        stale.len()
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Periodically sweep expired entries until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: std::time::Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired cache entries");
                }
            }
        })
    }
}

fn to_chrono(ttl: std::time::Duration) -> Duration {
    Duration::milliseconds(ttl.as_millis().min(i64::MAX as u128) as i64)
}
