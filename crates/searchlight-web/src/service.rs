//! The MCP service exposing search and URL reading.

use std::sync::Arc;

use async_trait::async_trait;
use searchlight_mcp::protocol::ResourceContents;
use searchlight_mcp::{
    CallToolResult, Implementation, McpError, McpService, ReadResourceResult, ResourceInfo,
    ToolInfo,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::WebError;
use crate::paginate::ReadOptions;
use crate::reader::CachedReader;
use crate::search::{SafeSearch, SearchBackend, SearchQuery, format_results};

/// Name of the search tool.
pub const SEARCH_TOOL: &str = "searxng_web_search";

/// Name of the URL reading tool.
pub const READ_TOOL: &str = "web_url_read";

/// URI of the configuration resource.
pub const CONFIG_RESOURCE: &str = "config://server-config";

/// URI of the usage guide resource.
pub const HELP_RESOURCE: &str = "help://usage-guide";

const USAGE_GUIDE: &str = "\
# Searchlight usage guide

## searxng_web_search

Search the web through the configured SearXNG instance.

- `query` (required): search terms
- `pageno`: result page, starting at 1
- `time_range`: `day`, `month` or `year`
- `language`: language code such as `en` or `fr` (default `all`)
- `safesearch`: `0` (off), `1` (moderate) or `2` (strict)

## web_url_read

Fetch a page and return it as readable markdown.

- `url` (required): http or https URL
- `readHeadings`: return only the headings, as a table of contents
- `section`: return only the section under the matching heading
- `paragraphRange`: paragraphs to return, e.g. `3`, `1-5` or `4-`
- `startChar` / `maxLength`: character window over the result

Pages are cached for a short time, so reading several slices of one page
only fetches it once.
";

/// Search and read tools over a shared backend.
///
/// Stateless across sessions; one instance serves every client.
pub struct SearchlightService {
    search: Arc<dyn SearchBackend>,
    reader: CachedReader,
    config_snapshot: Value,
}

impl SearchlightService {
    /// Create the service.
    pub fn new(search: Arc<dyn SearchBackend>, reader: CachedReader) -> Self {
        Self {
            search,
            reader,
            config_snapshot: json!({}),
        }
    }

    /// Set the JSON served as the configuration resource. Must not contain
    /// secrets.
    pub fn with_config_snapshot(mut self, snapshot: Value) -> Self {
        self.config_snapshot = snapshot;
        self
    }

    /// The cached reader.
    pub fn reader(&self) -> &CachedReader {
        &self.reader
    }

    fn tools() -> Vec<ToolInfo> {
        vec![
            ToolInfo {
                name: SEARCH_TOOL.to_string(),
                description: Some(
                    "Performs a web search using the SearXNG API, ideal for general queries, \
                     news, articles, and online content."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The search query"
                        },
                        "pageno": {
                            "type": "integer",
                            "description": "Search page number (starts at 1)",
                            "minimum": 1,
                            "default": 1
                        },
                        "time_range": {
                            "type": "string",
                            "description": "Time range of search (day, month, year)",
                            "enum": ["day", "month", "year"]
                        },
                        "language": {
                            "type": "string",
                            "description": "Language code for search results (e.g. 'en', 'fr'). Default is 'all'.",
                            "default": "all"
                        },
                        "safesearch": {
                            "type": "string",
                            "description": "Safe search filter level (0: None, 1: Moderate, 2: Strict)",
                            "enum": ["0", "1", "2"]
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolInfo {
                name: READ_TOOL.to_string(),
                description: Some(
                    "Read the content from a URL and convert it to markdown. Supports \
                     pagination and section extraction."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "URL to read"
                        },
                        "startChar": {
                            "type": "integer",
                            "description": "Starting character position (default 0)",
                            "minimum": 0
                        },
                        "maxLength": {
                            "type": "integer",
                            "description": "Maximum number of characters to return",
                            "minimum": 1
                        },
                        "section": {
                            "type": "string",
                            "description": "Extract the content under a heading containing this text"
                        },
                        "paragraphRange": {
                            "type": "string",
                            "description": "Paragraphs to return, e.g. '3', '1-5' or '4-'"
                        },
                        "readHeadings": {
                            "type": "boolean",
                            "description": "Return only the list of headings"
                        }
                    },
                    "required": ["url"]
                }),
            },
        ]
    }

    async fn web_search(&self, arguments: Value) -> Result<CallToolResult, McpError> {
        let args: SearchArgs = parse_arguments(arguments)?;
        let query = args.into_query()?;
        info!(query = %query.query, pageno = query.pageno, "Web search");

        let results = self.search.search(&query).await?;
        debug!(results = results.len(), "Web search complete");
        Ok(CallToolResult::text(format_results(&results)))
    }

    async fn read_url(&self, arguments: Value) -> Result<CallToolResult, McpError> {
        let args: ReadArgs = parse_arguments(arguments)?;
        let (url, options) = args.into_options()?;
        info!(url = %url, "Read URL");

        let text = self.reader.read(&url, &options).await?;
        if text.is_empty() {
            return Ok(CallToolResult::text("No content in the requested range."));
        }
        Ok(CallToolResult::text(text))
    }
}

#[async_trait]
impl McpService for SearchlightService {
    fn server_info(&self) -> Implementation {
        Implementation::new("searchlight", env!("CARGO_PKG_VERSION"))
    }

    fn instructions(&self) -> Option<String> {
        Some(format!(
            "Use {} to search the web and {} to read pages. Read {} for details.",
            SEARCH_TOOL, READ_TOOL, HELP_RESOURCE
        ))
    }

    async fn list_tools(&self) -> Result<Vec<ToolInfo>, McpError> {
        Ok(Self::tools())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = arguments.unwrap_or_else(|| json!({}));
        match name {
            SEARCH_TOOL => self.web_search(arguments).await,
            READ_TOOL => self.read_url(arguments).await,
            other => Err(McpError::UnknownTool(other.to_string())),
        }
    }

    async fn list_resources(&self) -> Result<Vec<ResourceInfo>, McpError> {
        Ok(vec![
            ResourceInfo {
                uri: CONFIG_RESOURCE.to_string(),
                name: "Server Configuration".to_string(),
                description: Some("Current server configuration (no secrets)".to_string()),
                mime_type: Some("application/json".to_string()),
            },
            ResourceInfo {
                uri: HELP_RESOURCE.to_string(),
                name: "Usage Guide".to_string(),
                description: Some("How to use the search and read tools".to_string()),
                mime_type: Some("text/markdown".to_string()),
            },
        ])
    }

    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let (mime_type, text) = match uri {
            CONFIG_RESOURCE => {
                let mut snapshot = self.config_snapshot.clone();
                if let Value::Object(map) = &mut snapshot {
                    map.insert("cache".to_string(), serde_json::to_value(self.reader.cache().stats())?);
                }
                ("application/json", serde_json::to_string_pretty(&snapshot)?)
            }
            HELP_RESOURCE => ("text/markdown", USAGE_GUIDE.to_string()),
            other => return Err(McpError::ResourceNotFound(other.to_string())),
        };

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some(mime_type.to_string()),
                text,
            }],
        })
    }
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments).map_err(|e| McpError::invalid_params(e.to_string()))
}

/// A value clients send either as a JSON number or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    fn as_u64(&self, name: &str) -> Result<u64, WebError> {
        let invalid = || WebError::InvalidArgument(format!("{} must be a non-negative integer", name));
        match self {
            Self::Number(n) => u64::try_from(*n).map_err(|_| invalid()),
            Self::String(s) => s.trim().parse().map_err(|_| invalid()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    pageno: Option<NumberOrString>,
    #[serde(default)]
    time_range: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    safesearch: Option<NumberOrString>,
}

impl SearchArgs {
    fn into_query(self) -> Result<SearchQuery, WebError> {
        if self.query.trim().is_empty() {
            return Err(WebError::InvalidArgument("query must not be empty".into()));
        }

        let mut query = SearchQuery::new(self.query);
        if let Some(pageno) = &self.pageno {
            let pageno = pageno.as_u64("pageno")?;
            query.pageno = u32::try_from(pageno)
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| WebError::InvalidArgument("pageno must be >= 1".into()))?;
        }
        if let Some(range) = self.time_range.as_deref().filter(|r| !r.is_empty()) {
            query.time_range = Some(range.parse()?);
        }
        if let Some(language) = self.language.filter(|l| !l.trim().is_empty()) {
            query.language = language;
        }
        if let Some(level) = &self.safesearch {
            query.safesearch = Some(SafeSearch::from_level(level.as_u64("safesearch")?)?);
        }
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadArgs {
    url: String,
    #[serde(default)]
    start_char: Option<NumberOrString>,
    #[serde(default)]
    max_length: Option<NumberOrString>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    paragraph_range: Option<String>,
    #[serde(default)]
    read_headings: Option<bool>,
}

impl ReadArgs {
    fn into_options(self) -> Result<(String, ReadOptions), WebError> {
        let mut options = ReadOptions {
            read_headings: self.read_headings.unwrap_or(false),
            section: self.section.filter(|s| !s.trim().is_empty()),
            ..Default::default()
        };

        if let Some(start) = &self.start_char {
            options.start_char = start.as_u64("startChar")? as usize;
        }
        if let Some(max) = &self.max_length {
            let max = max.as_u64("maxLength")?;
            if max == 0 {
                return Err(WebError::InvalidArgument("maxLength must be >= 1".into()));
            }
            options.max_length = Some(max as usize);
        }
        if let Some(range) = self.paragraph_range.as_deref().filter(|r| !r.trim().is_empty()) {
            options.paragraph_range = Some(range.parse()?);
        }

        Ok((self.url, options))
    }
}
