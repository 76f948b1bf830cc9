//! Web search and URL reading for Searchlight.
//!
//! Two tools are exposed through [`SearchlightService`]:
//! - `searxng_web_search` queries a SearXNG instance ([`SearxngClient`])
//! - `web_url_read` fetches a page, converts it to markdown and slices it
//!
//! Page reads go through [`CachedReader`], which keys the content cache by
//! URL only; pagination options are applied after the lookup.

pub mod client;
pub mod error;
pub mod fetch;
pub mod html;
pub mod paginate;
pub mod reader;
pub mod search;
pub mod service;

pub use client::{HttpClientConfig, ProxySettings, build_client};
pub use error::{Result, WebError};
pub use fetch::{ContentFetcher, FetchedContent, HttpFetcher, parse_http_url};
pub use paginate::{ParagraphRange, ReadOptions};
pub use reader::CachedReader;
pub use search::{
    BasicAuth, SafeSearch, SearchBackend, SearchQuery, SearchResult, SearxngClient, TimeRange,
    format_results,
};
pub use service::{READ_TOOL, SEARCH_TOOL, SearchlightService};
