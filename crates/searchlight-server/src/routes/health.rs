//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Number of registered sessions.
    pub sessions: usize,
    /// Number of unexpired cached documents, when a cache is attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_documents: Option<usize>,
}

/// Read-only health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.sessions.len(),
        cached_documents: state.cache.as_ref().map(|c| c.stats().size),
    })
}

/// Create health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use searchlight_cache::{CacheConfig, ContentCache};
    use searchlight_mcp::{CallToolResult, Implementation, McpError, McpService, ToolInfo};
    use serde_json::Value;

    use super::*;
    use crate::config::ServerConfig;

    struct NoTools;

    #[async_trait]
    impl McpService for NoTools {
        fn server_info(&self) -> Implementation {
            Implementation::new("none", "0.0.0")
        }

        async fn list_tools(&self) -> searchlight_mcp::Result<Vec<ToolInfo>> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: Option<Value>,
        ) -> searchlight_mcp::Result<CallToolResult> {
            Err(McpError::UnknownTool(name.to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_not_reported() {
        let cache = ContentCache::new(
            CacheConfig::new(Duration::from_secs(1)).with_sweep(false),
        )
        .unwrap();
        cache.set("https://old.example/", "raw", "derived");
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set("https://new.example/", "raw", "derived");

        // The expired entry is still stored until something evicts it
        assert_eq!(cache.len(), 2);

        let state = AppState::new(Arc::new(NoTools), ServerConfig::new()).with_cache(cache);
        let Json(response) = health(State(state)).await;
        assert_eq!(response.cached_documents, Some(1));
        assert_eq!(response.sessions, 0);
    }
}
