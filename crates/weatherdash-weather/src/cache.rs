//! In-memory cache with per-entry expiry.
//!
//! Expired entries are evicted lazily by `get`/`has` and in bulk by `sweep`,
//! which [`ExpiringCache::spawn_sweeper`] runs on a fixed period. Time comes
//! from `tokio::time::Instant`, so a paused test clock drives expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::types::QueryKind;

/// Default sweep period
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Smallest TTL an entry can get; keeps `expires_at > stored_at`.
const MIN_TTL: Duration = Duration::from_millis(1);

/// Largest TTL an entry can get; longer requests are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Cache key for a query: `"{kind}:{lower-cased city}"`.
pub fn cache_key(kind: QueryKind, city: &str) -> String {
    format!("{}:{}", kind.as_str(), city.trim().to_lowercase())
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub stored_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(data: V, ttl: Duration) -> Self {
        let stored_at = Instant::now();
        Self {
            data,
            stored_at,
            expires_at: stored_at + ttl.clamp(MIN_TTL, MAX_TTL),
        }
    }

    pub fn is_live(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

/// Diagnostic snapshot returned by [`ExpiringCache::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

#[derive(Debug)]
pub struct ExpiringCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key` until `now + ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries
            .lock()
            .insert(key.into(), CacheEntry::new(value, ttl));
    }

    /// The live value for `key`. An expired entry is removed and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        let live = entries.get(key)?.is_live(Instant::now());
        if live {
            entries.get(key).map(|entry| entry.data.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    /// Same expiry check and eviction as [`get`](Self::get), without cloning the value.
    pub fn has(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();
        let live = match entries.get(key) {
            Some(entry) => entry.is_live(Instant::now()),
            None => return false,
        };
        if !live {
            entries.remove(key);
        }
        live
    }

    /// Expiry instant of the entry under `key`, live or not. Does not evict.
    pub fn expires_at(&self, key: &str) -> Option<Instant> {
        self.entries.lock().get(key).map(|entry| entry.expires_at)
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock();
        let valid = entries.values().filter(|entry| entry.is_live(now)).count();

        CacheStats {
            total: entries.len(),
            valid,
            expired: entries.len() - valid,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<V: Clone + Send + 'static> ExpiringCache<V> {
    /// Run [`sweep`](Self::sweep) every `period` until `cancel` fires.
    pub fn spawn_sweeper(
        cache: Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, "Swept expired cache entries");
                        }
                    }
                }
            }

            tracing::debug!("Cache sweeper stopped");
        })
    }
}
