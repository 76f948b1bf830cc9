//! MCP (Model Context Protocol) server side for Searchlight.
//!
//! This crate provides the protocol layer shared by the HTTP and stdio
//! front ends: JSON-RPC types, the per-session transport state machine and
//! the [`McpService`] seam the tools plug into.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SessionTransport (one per client session)                  │
//! │  - Pending → Active(id) → Closed                            │
//! │  - initialize / ping / tools / resources / logging          │
//! │  - notification stream for server → client messages         │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpService (shared by all sessions)                        │
//! │  - list_tools, call_tool, list_resources, read_resource     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use searchlight_mcp::{Payload, SessionTransport};
//!
//! let transport = SessionTransport::new();
//! transport.connect(service.clone())?;
//! transport.on_initialized(|id| println!("session {id} ready"));
//! transport.on_closed(|id| println!("session {id} gone"));
//!
//! let reply = transport.handle_payload(Payload::parse(body)?).await?;
//! ```
//!
//! # Protocol flow
//!
//! 1. Client sends `initialize`; the transport generates the session id
//! 2. Client sends `notifications/initialized`
//! 3. Client calls `tools/list`, `tools/call`, `resources/*`
//! 4. The session ends with an explicit close (HTTP `DELETE`, stdio EOF)

pub mod error;
pub mod protocol;
pub mod service;
pub mod session;
pub mod stdio;
pub mod transport;

// Re-export main types
pub use error::{McpError, Result};
pub use protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, LoggingLevel, Payload, ReadResourceResult, RequestId, ResourceContents,
    ResourceInfo, ServerCapabilities, ToolContent, ToolInfo, is_initialize_request,
};
pub use service::{McpService, SharedService};
pub use session::{SessionId, SessionState};
pub use stdio::serve_stdio;
pub use transport::{SessionTransport, Subscription, TransportReply};
