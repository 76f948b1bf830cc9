//! Time-bounded content cache.
//!
//! This crate memoizes fetched documents keyed by their resource identifier
//! (usually a URL). Each entry holds the raw payload and the derived,
//! transformed text, and is only ever returned while younger than the
//! configured TTL:
//! - expired entries are filtered at read time and removed lazily
//! - a background sweep task evicts whatever nobody reads again
//! - the sweep is cancelled on [`ContentCache::shutdown`] or when the last
//!   handle is dropped
//!
//! # Example
//!
//! ```rust,ignore
//! use searchlight_cache::{CacheConfig, ContentCache};
//!
//! let cache = ContentCache::new(CacheConfig::new(Duration::from_secs(60)))?;
//! cache.set("https://example.com", "<html>..</html>", "# Example");
//!
//! if let Some(entry) = cache.get("https://example.com") {
//!     println!("{}", entry.derived);
//! }
//! ```

mod cache;
mod config;
mod error;
mod sweeper;
mod ttl;

pub use cache::{CacheEntry, CacheStats, ContentCache, EntryStats};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use ttl::TtlPolicy;
