//! Backend service seam between a session transport and the tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolResult, Implementation, ReadResourceResult, ResourceInfo, ResourcesCapability,
    ServerCapabilities, ToolInfo, ToolsCapability,
};

/// The MCP server surface a transport dispatches to.
///
/// One instance is shared by every session; implementations must not keep
/// per-session state.
#[async_trait]
pub trait McpService: Send + Sync {
    /// Name and version reported in the initialize result.
    fn server_info(&self) -> Implementation;

    /// Usage hints reported in the initialize result.
    fn instructions(&self) -> Option<String> {
        None
    }

    /// Capabilities reported in the initialize result.
    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: Some(ToolsCapability::default()),
            resources: Some(ResourcesCapability::default()),
            logging: Some(Value::Object(Default::default())),
        }
    }

    /// List the tools this service exposes.
    async fn list_tools(&self) -> Result<Vec<ToolInfo>>;

    /// Invoke a tool.
    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult>;

    /// List readable resources.
    async fn list_resources(&self) -> Result<Vec<ResourceInfo>> {
        Ok(Vec::new())
    }

    /// Read one resource.
    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        Err(McpError::ResourceNotFound(uri.to_string()))
    }
}

/// Service shared across sessions.
pub type SharedService = Arc<dyn McpService>;
