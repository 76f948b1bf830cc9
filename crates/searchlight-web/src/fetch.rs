//! Fetching URLs and converting them to readable text.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::client::DEFAULT_TIMEOUT;
use crate::error::{Result, WebError};
use crate::html::html_to_markdown;

/// Default cap on response bodies (10MB).
pub const DEFAULT_MAX_SIZE: usize = 10 * 1024 * 1024;

/// Raw and transformed content of one fetched URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    /// Response body as received.
    pub raw: String,
    /// Readable markdown-style text.
    pub derived: String,
}

/// Performs the network fetch and content transformation for a URL.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `url` and convert it to readable text.
    async fn fetch_and_transform(&self, url: &Url) -> Result<FetchedContent>;
}

/// Parse a user-supplied URL, accepting only http and https.
pub fn parse_http_url(input: &str) -> Result<Url> {
    let url = Url::parse(input.trim()).map_err(|e| WebError::InvalidUrl(format!("{}: {}", input, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(WebError::InvalidUrl(format!(
            "only http and https URLs are supported (got '{}')",
            other
        ))),
    }
}

/// [`ContentFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_size: usize,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout and size cap.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    /// Set the overall timeout for one fetch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum body size kept.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedContent> {
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WebError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();

        if let Some(announced) = response.content_length()
            && announced > self.max_size as u64
        {
            warn!(url = %url, announced, max_size = self.max_size, "Response exceeds size cap, truncating");
        }
        let bytes = read_capped(response, self.max_size).await?;

        let raw = String::from_utf8_lossy(&bytes).into_owned();
        if raw.trim().is_empty() {
            return Err(WebError::EmptyContent(url.to_string()));
        }

        let derived = if content_type.contains("html") {
            html_to_markdown(&raw)
        } else {
            raw.trim().to_string()
        };
        if derived.is_empty() {
            return Err(WebError::EmptyContent(url.to_string()));
        }

        Ok(FetchedContent { raw, derived })
    }
}

/// Read at most `max_size` bytes of the body, then drop the connection.
async fn read_capped(mut response: reqwest::Response, max_size: usize) -> Result<Vec<u8>> {
    let capacity = response
        .content_length()
        .map_or(0, |len| len.min(max_size as u64) as usize);
    let mut body = Vec::with_capacity(capacity);

    while let Some(chunk) = response.chunk().await? {
        let remaining = max_size - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            if chunk.len() > remaining {
                debug!(max_size, "Stopped reading at size cap");
            }
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_and_transform(&self, url: &Url) -> Result<FetchedContent> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.fetch(url))
            .await
            .map_err(|_| WebError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            })
            .and_then(|r| match r {
                Err(WebError::Request(e)) if e.is_timeout() => Err(WebError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }),
                other => other,
            });

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(content) => debug!(
                url = %url,
                duration_ms,
                raw_len = content.raw.len(),
                derived_len = content.derived.len(),
                "Fetched URL"
            ),
            Err(e) => warn!(url = %url, duration_ms, error = %e, "Fetch failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Client::new())
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://example.com/a").is_ok());
        assert!(parse_http_url("  http://example.com  ").is_ok());
        assert!(matches!(
            parse_http_url("file:///etc/passwd"),
            Err(WebError::InvalidUrl(_))
        ));
        assert!(matches!(parse_http_url("nope"), Err(WebError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    "<html><body><h1>X</h1><p>Body</p></body></html>",
                    "text/html; charset=utf-8",
                ),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let content = fetcher().fetch_and_transform(&url).await.unwrap();
        assert!(content.raw.contains("<h1>X</h1>"));
        assert_eq!(content.derived, "# X\n\nBody");
    }

    #[tokio::test]
    async fn test_fetch_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("  hello  \n", "text/plain"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let content = fetcher().fetch_and_transform(&url).await.unwrap();
        assert_eq!(content.derived, "hello");
    }

    #[tokio::test]
    async fn test_fetch_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher().fetch_and_transform(&url).await.unwrap_err();
        assert!(matches!(err, WebError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("   "))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher().fetch_and_transform(&url).await.unwrap_err();
        assert!(matches!(err, WebError::EmptyContent(_)));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_distinct() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetcher()
            .with_timeout(Duration::from_millis(100))
            .fetch_and_transform(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, WebError::Timeout { .. }));
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_fetch_truncates_large_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("abcdefghij", "text/plain"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let content = fetcher()
            .with_max_size(4)
            .fetch_and_transform(&url)
            .await
            .unwrap();
        assert_eq!(content.raw, "abcd");
    }

    #[tokio::test]
    async fn test_fetch_stops_reading_past_announced_cap() {
        let server = MockServer::start().await;
        let body = "x".repeat(2 * 1024 * 1024);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/plain"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let content = fetcher()
            .with_max_size(16)
            .fetch_and_transform(&url)
            .await
            .unwrap();
        assert_eq!(content.raw.len(), 16);
        assert_eq!(content.derived, "x".repeat(16));
    }

    #[tokio::test]
    async fn test_read_capped_bounds_buffer_across_chunks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![b'a'; 256 * 1024], "text/plain"),
            )
            .mount(&server)
            .await;

        let response = Client::new().get(server.uri()).send().await.unwrap();
        assert_eq!(response.content_length(), Some(256 * 1024));
        let body = read_capped(response, 1000).await.unwrap();
        assert_eq!(body.len(), 1000);
        assert!(body.capacity() <= 1000);
    }

    #[tokio::test]
    async fn test_read_capped_keeps_small_bodies_whole() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("short", "text/plain"))
            .mount(&server)
            .await;

        let response = Client::new().get(server.uri()).send().await.unwrap();
        assert_eq!(read_capped(response, 1000).await.unwrap(), b"short");
    }
}
