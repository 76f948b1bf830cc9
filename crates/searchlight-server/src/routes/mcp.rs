//! MCP Streamable HTTP endpoint.
//!
//! `POST /mcp` carries client messages, `GET /mcp` streams server
//! notifications as SSE and `DELETE /mcp` ends the session. The session is
//! named by the `Mcp-Session-Id` header, which the server hands out in the
//! response to the `initialize` handshake.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::post,
};
use futures::Stream;
use searchlight_mcp::{
    JsonRpcError, Payload, SessionId, SessionTransport, is_initialize_request,
};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Header naming the session.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Create the MCP routes.
pub fn mcp_routes() -> Router<AppState> {
    Router::new().route("/mcp", post(post_mcp).get(get_mcp).delete(delete_mcp))
}

/// Read the session header.
///
/// `Ok(None)` when absent, `Err(())` when present but not valid text.
fn session_header(headers: &HeaderMap) -> std::result::Result<Option<SessionId>, ()> {
    match headers.get(SESSION_ID_HEADER) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(SessionId::from(s.trim())))
            .map_err(|_| ()),
    }
}

/// The registered transport named by the header, for GET and DELETE.
fn registered_session(state: &AppState, headers: &HeaderMap) -> Result<(SessionId, Arc<SessionTransport>)> {
    let session_id = session_header(headers)
        .ok()
        .flatten()
        .ok_or(ServerError::InvalidSession)?;
    let transport = state
        .sessions
        .get(&session_id)
        .ok_or(ServerError::InvalidSession)?;
    Ok((session_id, transport))
}

/// POST /mcp
///
/// Routes the payload to the session's transport. Without a session id only
/// an `initialize` request is accepted; it creates a new transport that
/// registers itself once the handshake assigns its id.
pub async fn post_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        ServerError::Rpc(JsonRpcError::new(
            JsonRpcError::PARSE_ERROR,
            format!("Parse error: {}", e),
        ))
    })?;

    let session_id = session_header(&headers).map_err(|_| ServerError::MalformedSession)?;
    let (transport, created) = match session_id {
        Some(session_id) => {
            let transport = state
                .sessions
                .get(&session_id)
                .ok_or(ServerError::MalformedSession)?;
            (transport, false)
        }
        None if is_initialize_request(&value) => {
            (state.sessions.create(Arc::clone(&state.service))?, true)
        }
        None => return Err(ServerError::MalformedSession),
    };

    let payload = Payload::from_value(value).map_err(ServerError::Rpc)?;
    let reply = transport.handle_payload(payload).await?;

    if !reply.has_body() {
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    let mut response = Json(reply).into_response();
    if created && let Some(session_id) = transport.session_id() {
        let value = HeaderValue::from_str(session_id.as_str())
            .map_err(|e| ServerError::Internal(format!("Invalid session id: {}", e)))?;
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    Ok(response)
}

/// GET /mcp
///
/// Streams server-to-client notifications until the session closes.
pub async fn get_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let (session_id, transport) = registered_session(&state, &headers)?;
    let mut subscription = transport.subscribe();
    drop(transport);

    debug!(session_id = %session_id, "Notification stream opened");

    let stream = async_stream::stream! {
        while let Some(notification) = subscription.next().await {
            yield Ok(Event::default()
                .event("message")
                .json_data(&notification)
                .unwrap_or_else(|_| Event::default()));
        }
        debug!(session_id = %session_id, "Notification stream ended");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// DELETE /mcp
pub async fn delete_mcp(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let (session_id, _) = registered_session(&state, &headers)?;
    if !state.sessions.close(&session_id) {
        // Closed concurrently between lookup and close
        return Err(ServerError::InvalidSession);
    }
    Ok(StatusCode::OK)
}
