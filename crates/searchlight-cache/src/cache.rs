//! Content cache with TTL expiry and background eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::sweeper::Sweeper;
use crate::ttl::TtlPolicy;

/// Entry stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Payload as fetched from the network.
    pub raw: String,

    /// Transformed, readable form of the payload.
    pub derived: String,

    /// When this entry was inserted into cache.
    pub cached_at: Instant,
}

impl CacheEntry {
    /// Create a new cache entry stamped with the current time.
    pub fn new(raw: impl Into<String>, derived: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            derived: derived.into(),
            cached_at: Instant::now(),
        }
    }

    /// Time since insertion.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.cached_at)
    }
}

/// Entry map plus the expiry policy, shared with the sweep task.
pub(crate) struct CacheInner {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
    ttl: TtlPolicy,
}

impl CacheInner {
    /// Remove every expired entry and return how many were dropped.
    pub(crate) fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !self.ttl.is_expired(entry.cached_at, now));
        before - entries.len()
    }
}

/// Cache of fetched documents keyed by resource identifier.
///
/// The key is the resource identifier alone. Presentation parameters such
/// as character offsets or paragraph ranges are applied by callers after
/// lookup, so one cached document serves every slice of it.
///
/// Cloning is cheap; clones share entries and the sweep task. The sweep
/// stops on [`shutdown`](Self::shutdown) or once every clone is dropped.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<CacheInner>,
    sweeper: Arc<Mutex<Option<Sweeper>>>,
    config: CacheConfig,
}

impl ContentCache {
    /// Create a cache and, if enabled, start its sweep task.
    ///
    /// The sweep task is spawned on the ambient Tokio runtime; outside a
    /// runtime the cache still works with lazy eviction only.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(CacheInner {
            entries: RwLock::new(HashMap::new()),
            ttl: TtlPolicy::new(config.ttl),
        });

        let sweeper = if config.enable_sweep {
            Sweeper::spawn(Arc::downgrade(&inner), config.effective_sweep_interval())
        } else {
            None
        };

        Ok(Self {
            inner,
            sweeper: Arc::new(Mutex::new(sweeper)),
            config,
        })
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl.ttl()
    }

    /// Insert or overwrite the entry for `key`, resetting its age.
    pub fn set(&self, key: &str, raw: impl Into<String>, derived: impl Into<String>) {
        let entry = Arc::new(CacheEntry::new(raw, derived));
        let mut entries = self.inner.entries.write();
        entries.insert(key.to_string(), entry);

        trace!(key = %key, cache_size = entries.len(), "Content cached");
    }

    /// Look up a live entry.
    ///
    /// An expired entry is never returned; if one is found it is removed
    /// on the spot.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let now = Instant::now();
        {
            let entries = self.inner.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !self.inner.ttl.is_expired(entry.cached_at, now) => {
                    trace!(key = %key, "Content cache hit");
                    return Some(Arc::clone(entry));
                }
                Some(_) => {}
            }
        }

        // Re-check under the write lock, a concurrent set may have refreshed it
        let mut entries = self.inner.entries.write();
        if entries
            .get(key)
            .is_some_and(|entry| self.inner.ttl.is_expired(entry.cached_at, now))
        {
            entries.remove(key);
            debug!(key = %key, "Expired content evicted on lookup");
        }
        None
    }

    /// Check for a live entry without cloning it.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| !self.inner.ttl.is_expired(entry.cached_at, now))
    }

    /// Remove every entry regardless of age.
    pub fn clear(&self) {
        let mut entries = self.inner.entries.write();
        let count = entries.len();
        entries.clear();
        debug!(count, "Content cache cleared");
    }

    /// Evict expired entries now. The sweep task calls this periodically.
    pub fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Diagnostics over live entries.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.inner.entries.read();

        let mut live: Vec<EntryStats> = entries
            .iter()
            .filter(|(_, entry)| !self.inner.ttl.is_expired(entry.cached_at, now))
            .map(|(key, entry)| EntryStats {
                key: key.clone(),
                age_ms: now.saturating_duration_since(entry.cached_at).as_millis() as u64,
            })
            .collect();
        live.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            size: live.len(),
            ttl_ms: self.inner.ttl.ttl().as_millis() as u64,
            entries: live,
        }
    }

    /// Stop the sweep task. Idempotent.
    ///
    /// The cache keeps serving reads and writes afterwards; expired entries
    /// are still filtered and evicted on lookup.
    pub fn shutdown(&self) {
        if self.sweeper.lock().take().is_some() {
            debug!("Content cache sweep shut down");
        }
    }

    /// Whether the sweep task is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|sweeper| sweeper.is_running())
    }
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("ttl", &self.inner.ttl.ttl())
            .field("len", &self.len())
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of live entries.
    pub size: usize,

    /// Configured TTL in milliseconds.
    pub ttl_ms: u64,

    /// Per-entry details, sorted by key.
    pub entries: Vec<EntryStats>,
}

/// Age of one live entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryStats {
    /// Resource identifier.
    pub key: String,

    /// Milliseconds since the entry was inserted.
    pub age_ms: u64,
}
