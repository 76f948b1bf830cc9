//! TTL policy for cache entry expiration.

use std::time::Duration;

use tokio::time::Instant;

/// Decides whether an entry inserted at a given instant is still live.
///
/// An entry is live while `now - cached_at < ttl`; at exactly `ttl` it is
/// already expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    ttl: Duration,
}

impl TtlPolicy {
    /// Create a policy with the given lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Get the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check whether an entry created at `cached_at` has expired by `now`.
    pub fn is_expired(&self, cached_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(cached_at) >= self.ttl
    }

    /// Time left before an entry created at `cached_at` expires.
    pub fn remaining(&self, cached_at: Instant, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(cached_at))
    }
}
