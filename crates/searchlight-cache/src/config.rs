//! Configuration for the content cache.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default lifetime of a cached document (one minute).
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Configuration for the content cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached entries, measured from insertion.
    pub ttl: Duration,

    /// Interval for the background sweep.
    /// `None` sweeps once per TTL. Values above the TTL are clamped to it,
    /// which bounds the lifetime of an unread entry to twice the TTL.
    pub sweep_interval: Option<Duration>,

    /// Whether to run the background sweep at all.
    /// If false, expired entries are only evicted when looked up.
    pub enable_sweep: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: None,
            enable_sweep: true,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    /// Set the TTL for cached entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Enable or disable the background sweep.
    pub fn with_sweep(mut self, enabled: bool) -> Self {
        self.enable_sweep = enabled;
        self
    }

    /// The interval the sweep task actually runs at.
    pub fn effective_sweep_interval(&self) -> Duration {
        self.sweep_interval.unwrap_or(self.ttl).min(self.ttl)
    }

    /// Reject configurations that would make every entry dead on arrival
    /// or spin the sweep task.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(Error::InvalidConfig("ttl must be greater than zero".into()));
        }
        if self.sweep_interval.is_some_and(|i| i.is_zero()) {
            return Err(Error::InvalidConfig(
                "sweep interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
