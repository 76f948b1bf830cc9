//! SearXNG web search.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, WebError};

/// Restrict results to a recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Month,
    Year,
}

impl TimeRange {
    /// Value of the `time_range` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl FromStr for TimeRange {
    type Err = WebError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(WebError::InvalidArgument(format!(
                "time_range must be one of day, month, year (got '{}')",
                other
            ))),
        }
    }
}

/// SearXNG safe-search level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeSearch {
    Off,
    Moderate,
    Strict,
}

impl SafeSearch {
    /// Numeric level sent to SearXNG.
    pub fn level(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Moderate => 1,
            Self::Strict => 2,
        }
    }

    /// Parse a numeric level.
    pub fn from_level(level: u64) -> Result<Self> {
        match level {
            0 => Ok(Self::Off),
            1 => Ok(Self::Moderate),
            2 => Ok(Self::Strict),
            other => Err(WebError::InvalidArgument(format!(
                "safesearch must be 0, 1 or 2 (got {})",
                other
            ))),
        }
    }
}

/// A search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Query text.
    pub query: String,
    /// 1-based result page.
    pub pageno: u32,
    /// Optional recency filter.
    pub time_range: Option<TimeRange>,
    /// Language code, or `all`.
    pub language: String,
    /// Optional safe-search level.
    pub safesearch: Option<SafeSearch>,
}

impl SearchQuery {
    /// A first-page query with default options.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            pageno: 1,
            time_range: None,
            language: "all".to_string(),
            safesearch: None,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Snippet.
    #[serde(default)]
    pub content: Option<String>,
    /// Engine relevance score.
    #[serde(default)]
    pub score: Option<f64>,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Description: {}", self.content.as_deref().unwrap_or(""))?;
        writeln!(f, "URL: {}", self.url)?;
        write!(f, "Relevance Score: {:.3}", self.score.unwrap_or(0.0))
    }
}

/// Render results as the text block returned to clients.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found".to_string();
    }
    results
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A web search provider.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a query.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>>;
}

/// Basic-auth credentials.
#[derive(Clone)]
pub struct BasicAuth {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Client for a SearXNG instance's JSON API.
#[derive(Debug, Clone)]
pub struct SearxngClient {
    client: Client,
    base_url: Url,
    auth: Option<BasicAuth>,
}

impl SearxngClient {
    /// Create a client for the instance at `base_url`.
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WebError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(WebError::InvalidUrl(format!(
                "SearXNG URL must be http or https: {}",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            auth: None,
        })
    }

    /// Send HTTP basic auth with every request.
    pub fn with_auth(mut self, auth: Option<BasicAuth>) -> Self {
        self.auth = auth;
        self
    }

    /// The instance URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/search` with the query parameters appended to any the
    /// instance URL already carries. The fragment is dropped.
    fn search_url(&self, query: &SearchQuery) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| WebError::InvalidUrl(format!("cannot be a base URL: {}", self.base_url)))?
            .pop_if_empty()
            .push("search");

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &query.query)
                .append_pair("format", "json")
                .append_pair("pageno", &query.pageno.to_string());
            if let Some(range) = query.time_range {
                pairs.append_pair("time_range", range.as_str());
            }
            if query.language != "all" {
                pairs.append_pair("language", &query.language);
            }
            if let Some(safesearch) = query.safesearch {
                pairs.append_pair("safesearch", &safesearch.level().to_string());
            }
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[async_trait]
impl SearchBackend for SearxngClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let url = self.search_url(query)?;
        debug!(query = %query.query, pageno = query.pageno, "SearXNG search");

        let mut request = self.client.get(url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "SearXNG search failed");
            return Err(WebError::Status {
                status: status.as_u16(),
                url: self.base_url.to_string(),
            });
        }

        let body: SearxngResponse = response
            .json()
            .await
            .map_err(|e| WebError::Parse(e.to_string()))?;
        debug!(results = body.results.len(), "SearXNG search complete");
        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn results_body() -> &'static str {
        r#"{
            "query": "rust",
            "results": [
                {"title": "Rust", "url": "https://www.rust-lang.org", "content": "A language", "score": 2.5},
                {"title": "Crates", "url": "https://crates.io", "content": null}
            ]
        }"#
    }

    #[tokio::test]
    async fn test_search_returns_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust lang"))
            .and(query_param("format", "json"))
            .and(query_param("pageno", "2"))
            .and(query_param("time_range", "month"))
            .and(query_param("safesearch", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(results_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearxngClient::new(Client::new(), &server.uri()).unwrap();
        let query = SearchQuery {
            pageno: 2,
            time_range: Some(TimeRange::Month),
            safesearch: Some(SafeSearch::Moderate),
            ..SearchQuery::new("rust lang")
        };

        let results = client.search(&query).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust");
        assert_eq!(results[0].score, Some(2.5));
        assert_eq!(results[1].content, None);
    }

    #[tokio::test]
    async fn test_search_sends_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results": []}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearxngClient::new(Client::new(), &server.uri())
            .unwrap()
            .with_auth(Some(BasicAuth {
                username: "user".into(),
                password: "pass".into(),
            }));

        let results = client.search(&SearchQuery::new("q")).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SearxngClient::new(Client::new(), &server.uri()).unwrap();
        let err = client.search(&SearchQuery::new("q")).await.unwrap_err();
        assert!(matches!(err, WebError::Status { status: 429, .. }));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(SearxngClient::new(Client::new(), "not a url").is_err());
        assert!(SearxngClient::new(Client::new(), "ftp://search.local").is_err());
    }

    #[test]
    fn test_search_url_omits_defaults() {
        let client = SearxngClient::new(Client::new(), "http://search.local/").unwrap();
        let url = client.search_url(&SearchQuery::new("a&b")).unwrap();
        assert_eq!(url.as_str(), "http://search.local/search?q=a%26b&format=json&pageno=1");
    }

    #[test]
    fn test_search_url_keeps_base_path_and_query() {
        let client =
            SearxngClient::new(Client::new(), "https://host.example/searx?token=abc#top").unwrap();
        let query = SearchQuery {
            language: "de".into(),
            ..SearchQuery::new("rust lang")
        };
        let url = client.search_url(&query).unwrap();

        assert_eq!(url.path(), "/searx/search");
        assert_eq!(url.fragment(), None);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("token".to_string(), "abc".to_string()),
                ("q".to_string(), "rust lang".to_string()),
                ("format".to_string(), "json".to_string()),
                ("pageno".to_string(), "1".to_string()),
                ("language".to_string(), "de".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_against_instance_with_query_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("token", "abc"))
            .and(query_param("q", "rust"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results": []}"#))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/?token=abc", server.uri());
        let client = SearxngClient::new(Client::new(), &base).unwrap();
        let results = client.search(&SearchQuery::new("rust")).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_format_results() {
        assert_eq!(format_results(&[]), "No results found");

        let text = format_results(&[
            SearchResult {
                title: "One".into(),
                url: "https://one.example".into(),
                content: Some("first".into()),
                score: Some(1.0),
            },
            SearchResult {
                title: "Two".into(),
                url: "https://two.example".into(),
                content: None,
                score: None,
            },
        ]);
        assert_eq!(
            text,
            "Title: One\nDescription: first\nURL: https://one.example\nRelevance Score: 1.000\n\n\
             Title: Two\nDescription: \nURL: https://two.example\nRelevance Score: 0.000"
        );
    }

    #[test]
    fn test_option_parsing() {
        assert_eq!("day".parse::<TimeRange>().unwrap(), TimeRange::Day);
        assert!("week".parse::<TimeRange>().is_err());
        assert_eq!(SafeSearch::from_level(2).unwrap(), SafeSearch::Strict);
        assert!(SafeSearch::from_level(3).is_err());
    }
}
