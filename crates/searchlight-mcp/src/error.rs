//! Error types for MCP operations.

use thiserror::Error;

use crate::protocol::JsonRpcError;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The message is not acceptable in the current protocol state.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Request parameters are missing or malformed.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// No handler for the requested method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// No tool with the requested name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// No resource with the requested URI.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A request arrived before the initialize handshake.
    #[error("server not initialized")]
    NotInitialized,

    /// A second initialize arrived on an initialized session.
    #[error("server already initialized")]
    AlreadyInitialized,

    /// The session has been terminated.
    #[error("session closed")]
    SessionClosed,

    /// The transport has no backend service attached.
    #[error("transport not connected to a service")]
    NotConnected,

    /// Tool execution failed.
    #[error("tool error: {0}")]
    ToolError(String),

    /// The operation did not finish in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error with an explicit JSON-RPC code, passed through unchanged.
    #[error("server error {code}: {message}")]
    ServerError {
        /// Error code.
        code: i64,
        /// Error message.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },
}

impl McpError {
    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an invalid params error.
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    /// Create a tool error.
    pub fn tool_error(msg: impl Into<String>) -> Self {
        Self::ToolError(msg.into())
    }

    /// Create a server error with an explicit code.
    pub fn server_error(
        code: i64,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
            data,
        }
    }

    /// JSON-RPC code this error is reported with.
    pub fn code(&self) -> i64 {
        match self {
            Self::Protocol(_) | Self::AlreadyInitialized => JsonRpcError::INVALID_REQUEST,
            Self::InvalidParams(_) | Self::UnknownTool(_) | Self::Json(_) => {
                JsonRpcError::INVALID_PARAMS
            }
            Self::MethodNotFound(_) => JsonRpcError::METHOD_NOT_FOUND,
            Self::ResourceNotFound(_) => JsonRpcError::RESOURCE_NOT_FOUND,
            Self::NotInitialized | Self::SessionClosed => JsonRpcError::BAD_REQUEST,
            Self::NotConnected | Self::ToolError(_) | Self::Timeout(_) | Self::Io(_) => {
                JsonRpcError::INTERNAL_ERROR
            }
            Self::ServerError { code, .. } => *code,
        }
    }

    /// Whether the failure lies with the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code(),
            JsonRpcError::INVALID_REQUEST
                | JsonRpcError::INVALID_PARAMS
                | JsonRpcError::METHOD_NOT_FOUND
                | JsonRpcError::RESOURCE_NOT_FOUND
                | JsonRpcError::BAD_REQUEST
        )
    }

    /// Convert to the JSON-RPC error object sent to the client.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            Self::ServerError {
                code,
                message,
                data,
            } => JsonRpcError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            Self::NotInitialized => {
                JsonRpcError::new(self.code(), "Bad Request: Server not initialized")
            }
            other => JsonRpcError::new(other.code(), other.to_string()),
        }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(e: McpError) -> Self {
        e.to_rpc_error()
    }
}
