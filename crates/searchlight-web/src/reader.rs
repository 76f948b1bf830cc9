//! Cache-aware URL reader.

use std::sync::Arc;

use searchlight_cache::ContentCache;
use tracing::debug;

use crate::error::Result;
use crate::fetch::{ContentFetcher, parse_http_url};
use crate::paginate::{ReadOptions, apply};

/// Reads URLs through the content cache.
///
/// The cache key is the normalized URL alone. Presentation options are
/// applied to the cached text on every call, so reading different slices
/// of one page costs a single fetch per TTL window.
#[derive(Clone)]
pub struct CachedReader {
    cache: ContentCache,
    fetcher: Arc<dyn ContentFetcher>,
}

impl CachedReader {
    /// Create a reader over `cache` and `fetcher`.
    pub fn new(cache: ContentCache, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Fetch (or reuse) the converted document for `url`.
    pub async fn document(&self, url: &str) -> Result<String> {
        let url = parse_http_url(url)?;
        let key = url.as_str();

        if let Some(entry) = self.cache.get(key) {
            debug!(url = %key, age_ms = entry.age().as_millis() as u64, "Content cache hit");
            return Ok(entry.derived.clone());
        }

        debug!(url = %key, "Content cache miss");
        let content = self.fetcher.fetch_and_transform(&url).await?;
        self.cache.set(key, content.raw, content.derived.clone());
        Ok(content.derived)
    }

    /// Read `url` and apply presentation options.
    pub async fn read(&self, url: &str, options: &ReadOptions) -> Result<String> {
        let document = self.document(url).await?;
        Ok(apply(&document, options))
    }
}

impl std::fmt::Debug for CachedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedReader")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use searchlight_cache::CacheConfig;
    use url::Url;

    use super::*;
    use crate::error::WebError;
    use crate::fetch::FetchedContent;

    /// Counts network calls and serves a fixed document.
    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentFetcher for CountingFetcher {
        async fn fetch_and_transform(&self, url: &Url) -> Result<FetchedContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.host_str() == Some("down.example") {
                return Err(WebError::Status {
                    status: 502,
                    url: url.to_string(),
                });
            }
            Ok(FetchedContent {
                raw: "<p>one</p><p>two</p>".to_string(),
                derived: "one\n\ntwo".to_string(),
            })
        }
    }

    fn reader(ttl: Duration) -> (CachedReader, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = ContentCache::new(CacheConfig::new(ttl)).unwrap();
        (CachedReader::new(cache, fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn test_pagination_does_not_split_cache() {
        let (reader, fetcher) = reader(Duration::from_secs(60));

        let first = reader
            .read(
                "https://a.example/doc",
                &ReadOptions {
                    max_length: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let second = reader
            .read(
                "https://a.example/doc",
                &ReadOptions {
                    start_char: 5,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first, "one");
        assert_eq!(second, "two");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(reader.cache().len(), 1);

        let entry = reader.cache().get("https://a.example/doc").unwrap();
        assert_eq!(entry.raw, "<p>one</p><p>two</p>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_after_ttl() {
        let (reader, fetcher) = reader(Duration::from_millis(1000));

        reader.document("https://a.example/").await.unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        reader.document("https://a.example/").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(1000)).await;
        reader.document("https://a.example/").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (reader, fetcher) = reader(Duration::from_secs(60));

        for _ in 0..2 {
            let err = reader.document("https://down.example/").await.unwrap_err();
            assert!(matches!(err, WebError::Status { status: 502, .. }));
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(reader.cache().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_never_fetches() {
        let (reader, fetcher) = reader(Duration::from_secs(60));
        let err = reader.document("mailto:someone@example.com").await.unwrap_err();
        assert!(matches!(err, WebError::InvalidUrl(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
