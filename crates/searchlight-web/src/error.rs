//! Error types for search and fetch operations.

use std::time::Duration;

use searchlight_mcp::McpError;
use thiserror::Error;

/// Result type for web operations.
pub type Result<T> = std::result::Result<T, WebError>;

/// Error type for web operations.
#[derive(Debug, Error)]
pub enum WebError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A tool argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The response carried no readable content.
    #[error("no content at {0}")]
    EmptyContent(String),

    /// The response could not be decoded.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// A proxy URL is invalid.
    #[error("invalid proxy configuration: {0}")]
    Proxy(String),
}

impl WebError {
    /// Whether this is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<WebError> for McpError {
    fn from(e: WebError) -> Self {
        match e {
            WebError::InvalidUrl(_) | WebError::InvalidArgument(_) => {
                McpError::invalid_params(e.to_string())
            }
            WebError::Timeout { .. } => McpError::Timeout(e.to_string()),
            other => McpError::tool_error(other.to_string()),
        }
    }
}
