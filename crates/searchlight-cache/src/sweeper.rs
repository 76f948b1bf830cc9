//! Background task that periodically evicts expired entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::cache::CacheInner;

/// Handle to a running sweep task. Dropping it stops the task.
pub(crate) struct Sweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep task on the current Tokio runtime.
    ///
    /// Returns `None` outside a runtime; the cache then relies on lazy
    /// eviction only.
    pub(crate) fn spawn(inner: Weak<CacheInner>, interval: Duration) -> Option<Self> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No Tokio runtime available, content cache sweep disabled");
                return None;
            }
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // Every cache handle is gone
                        let Some(inner) = inner.upgrade() else { break };
                        let removed = inner.purge_expired();
                        if removed > 0 {
                            debug!(removed, "Swept expired cache entries");
                        }
                    }
                }
            }

            trace!("Content cache sweep stopped");
        });

        debug!(interval_ms = interval.as_millis() as u64, "Content cache sweep started");

        Some(Self { cancel, handle })
    }

    /// Whether the task is still running.
    pub(crate) fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}
