//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use searchlight_mcp::{JsonRpcError, JsonRpcResponse, McpError};
use serde::Serialize;
use thiserror::Error;

/// Message of the JSON-RPC rejection for requests that cannot be tied to a
/// session.
pub const MALFORMED_SESSION_MESSAGE: &str = "Bad Request: No valid session ID provided";

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A POST that is neither for a registered session nor a handshake.
    ///
    /// Answered with a JSON-RPC error object rather than the usual body.
    #[error("Bad Request: No valid session ID provided")]
    MalformedSession,

    /// GET or DELETE without a registered session id.
    #[error("Invalid or missing session ID")]
    InvalidSession,

    /// The body could not be decoded as JSON-RPC.
    #[error("{}", .0.message)]
    Rpc(JsonRpcError),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<McpError> for ServerError {
    fn from(e: McpError) -> Self {
        match e {
            McpError::SessionClosed => ServerError::MalformedSession,
            e if e.is_client_error() => ServerError::BadRequest(e.to_string()),
            e => ServerError::Internal(e.to_string()),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        let (status, code) = match &self {
            ServerError::MalformedSession => {
                let error = JsonRpcError::new(JsonRpcError::BAD_REQUEST, MALFORMED_SESSION_MESSAGE);
                return rpc_rejection(error);
            }
            ServerError::Rpc(error) => return rpc_rejection(error.clone()),
            ServerError::InvalidSession => (StatusCode::BAD_REQUEST, "invalid_session"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ServerError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error")
            }
        };

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// A 400 carrying a JSON-RPC error object with a null id.
fn rpc_rejection(error: JsonRpcError) -> Response {
    tracing::warn!(code = error.code, error = %error.message, "Rejected JSON-RPC request");
    (
        StatusCode::BAD_REQUEST,
        Json(JsonRpcResponse::error(None, error)),
    )
        .into_response()
}
