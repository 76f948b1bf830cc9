//! Per-session protocol transport.
//!
//! A [`SessionTransport`] owns the protocol state of one client session. It
//! is constructed in the [`SessionState::Pending`] state, becomes active when
//! the `initialize` handshake assigns it a [`SessionId`], and is closed
//! exactly once. Owners learn about both transitions through callbacks, which
//! is how the HTTP server keeps its session registry in sync.

use std::sync::OnceLock;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JsonRpcMessage, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListResourcesResult, ListToolsResult, LoggingLevel,
    LoggingMessageParams, Payload, ReadResourceParams, SetLevelParams,
    negotiate_protocol_version,
};
use crate::service::SharedService;
use crate::session::{SessionId, SessionState};

/// Callback fired once when the handshake assigns a session id.
pub type InitializedCallback = Box<dyn FnOnce(SessionId) + Send>;

/// Callback fired once when an active session is closed.
pub type ClosedCallback = Box<dyn FnOnce(SessionId) + Send>;

/// Buffered server-to-client notifications per session.
const NOTIFICATION_CAPACITY: usize = 64;

/// Logger name used for `notifications/message`.
const LOGGER_NAME: &str = "searchlight";

/// What a transport produced for one inbound payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TransportReply {
    /// Only notifications or responses were received; nothing to send back.
    Accepted,
    /// Response to a single request.
    Single(JsonRpcResponse),
    /// Responses to the requests of a batch, in arrival order.
    Batch(Vec<JsonRpcResponse>),
}

impl TransportReply {
    /// Whether there is a body to send back.
    pub fn has_body(&self) -> bool {
        !matches!(self, Self::Accepted)
    }
}

/// Protocol state machine for one session.
pub struct SessionTransport {
    state: Mutex<SessionState>,
    service: OnceLock<SharedService>,
    /// Serializes inbound frames so a session's requests run in arrival order.
    frames: tokio::sync::Mutex<()>,
    on_initialized: Mutex<Option<InitializedCallback>>,
    on_closed: Mutex<Option<ClosedCallback>>,
    notifications: broadcast::Sender<JsonRpcNotification>,
    closed: CancellationToken,
    log_level: Mutex<LoggingLevel>,
}

impl Default for SessionTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTransport {
    /// Create a transport in the pending state.
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            state: Mutex::new(SessionState::Pending),
            service: OnceLock::new(),
            frames: tokio::sync::Mutex::new(()),
            on_initialized: Mutex::new(None),
            on_closed: Mutex::new(None),
            notifications,
            closed: CancellationToken::new(),
            log_level: Mutex::new(LoggingLevel::Info),
        }
    }

    /// Bind the backend service. A transport can be connected only once.
    pub fn connect(&self, service: SharedService) -> Result<()> {
        self.service
            .set(service)
            .map_err(|_| McpError::protocol("transport already connected"))
    }

    /// Register the handshake callback, replacing any previous one.
    ///
    /// The callback runs while the session state is locked, so it must not
    /// call back into this transport.
    pub fn on_initialized(&self, callback: impl FnOnce(SessionId) + Send + 'static) {
        *self.on_initialized.lock() = Some(Box::new(callback));
    }

    /// Register the close callback, replacing any previous one.
    pub fn on_closed(&self, callback: impl FnOnce(SessionId) + Send + 'static) {
        *self.on_closed.lock() = Some(Box::new(callback));
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// The session id once the handshake has completed.
    pub fn session_id(&self) -> Option<SessionId> {
        self.state.lock().session_id().cloned()
    }

    /// Whether the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().is_closed()
    }

    /// Handle one POSTed payload.
    ///
    /// Fails only when the transport itself cannot take messages (closed or
    /// not connected). Errors raised while handling individual requests are
    /// returned as JSON-RPC error responses.
    pub async fn handle_payload(&self, payload: Payload) -> Result<TransportReply> {
        let _frame = self.frames.lock().await;

        if self.is_closed() {
            return Err(McpError::SessionClosed);
        }
        let service = self.service.get().cloned().ok_or(McpError::NotConnected)?;

        match payload {
            Payload::Single(message) => Ok(match self.handle_message(&service, message).await {
                Some(response) => TransportReply::Single(response),
                None => TransportReply::Accepted,
            }),
            Payload::Batch(messages) => {
                let mut responses = Vec::new();
                for message in messages {
                    if let Some(response) = self.handle_message(&service, message).await {
                        responses.push(response);
                    }
                }
                if responses.is_empty() {
                    Ok(TransportReply::Accepted)
                } else {
                    Ok(TransportReply::Batch(responses))
                }
            }
        }
    }

    async fn handle_message(
        &self,
        service: &SharedService,
        message: JsonRpcMessage,
    ) -> Option<JsonRpcResponse> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(service, request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification);
                None
            }
            JsonRpcMessage::Response(response) => {
                trace!(id = ?response.id, "Ignoring client response");
                None
            }
        }
    }

    async fn handle_request(
        &self,
        service: &SharedService,
        request: JsonRpcRequest,
    ) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        let started = Instant::now();

        match self.dispatch(service, &method, params).await {
            Ok(result) => {
                debug!(
                    session_id = ?self.session_id().map(|s| s.to_string()),
                    method = %method,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Request handled"
                );
                JsonRpcResponse::success(id, result)
            }
            Err(e) => {
                let session_id = self.session_id().map(|s| s.to_string());
                if e.is_client_error() {
                    debug!(session_id = ?session_id, method = %method, error = %e, "Request rejected");
                } else {
                    warn!(session_id = ?session_id, method = %method, error = %e, "Request failed");
                }
                if method == "tools/call" {
                    self.log(
                        LoggingLevel::Error,
                        json!({ "method": method, "error": e.to_string() }),
                    );
                }
                JsonRpcResponse::error(Some(id), e.to_rpc_error())
            }
        }
    }

    fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => {
                debug!(session_id = ?self.session_id().map(|s| s.to_string()), "Client ready");
            }
            "notifications/cancelled" => {
                debug!(params = ?notification.params, "Client cancelled a request");
            }
            other => trace!(method = %other, "Ignoring notification"),
        }
    }

    async fn dispatch(
        &self,
        service: &SharedService,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value> {
        match method {
            "initialize" => return self.initialize(service, params),
            "ping" => return Ok(json!({})),
            _ => {}
        }

        if self.session_id().is_none() {
            return Err(McpError::NotInitialized);
        }

        match method {
            "tools/list" => {
                let tools = service.list_tools().await?;
                Ok(serde_json::to_value(ListToolsResult {
                    tools,
                    next_cursor: None,
                })?)
            }
            "tools/call" => {
                let params: CallToolParams = parse_params(params)?;
                let result = service.call_tool(&params.name, params.arguments).await?;
                Ok(serde_json::to_value(result)?)
            }
            "resources/list" => {
                let resources = service.list_resources().await?;
                Ok(serde_json::to_value(ListResourcesResult { resources })?)
            }
            "resources/read" => {
                let params: ReadResourceParams = parse_params(params)?;
                Ok(serde_json::to_value(service.read_resource(&params.uri).await?)?)
            }
            "logging/setLevel" => {
                let params: SetLevelParams = parse_params(params)?;
                *self.log_level.lock() = params.level;
                debug!(level = ?params.level, "Client log level set");
                Ok(json!({}))
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self, service: &SharedService, params: Option<Value>) -> Result<Value> {
        let params: InitializeParams = parse_params(params)?;

        let session_id = {
            let mut state = self.state.lock();
            match *state {
                SessionState::Pending => {}
                SessionState::Active(_) => return Err(McpError::AlreadyInitialized),
                SessionState::Closed => return Err(McpError::SessionClosed),
            }

            let session_id = SessionId::generate();
            *state = SessionState::Active(session_id.clone());

            // Fired under the state lock so a concurrent close cannot run
            // between activation and registration.
            let callback = self.on_initialized.lock().take();
            if let Some(callback) = callback {
                callback(session_id.clone());
            }
            session_id
        };

        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        info!(
            session_id = %session_id,
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version,
            "Session initialized"
        );

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: service.capabilities(),
            server_info: service.server_info(),
            instructions: service.instructions(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Subscribe to server-to-client notifications.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.notifications.subscribe(),
            closed: self.closed.clone(),
        }
    }

    /// Publish a notification to every subscriber.
    pub fn notify(&self, method: impl Into<String>, params: Option<Value>) {
        let notification = JsonRpcNotification::new(method, params);
        if self.notifications.send(notification).is_err() {
            trace!("No notification subscribers");
        }
    }

    /// Publish a `notifications/message` if `level` passes the client's filter.
    pub fn log(&self, level: LoggingLevel, data: Value) {
        if level < *self.log_level.lock() {
            return;
        }
        let params = LoggingMessageParams {
            level,
            logger: Some(LOGGER_NAME.to_string()),
            data,
        };
        match serde_json::to_value(params) {
            Ok(params) => self.notify("notifications/message", Some(params)),
            Err(e) => warn!(error = %e, "Failed to encode log notification"),
        }
    }

    /// Close the session.
    ///
    /// Returns `false` if it was already closed. The close callback fires
    /// only for sessions that completed the handshake, and at most once.
    pub fn close(&self) -> bool {
        let previous = std::mem::replace(&mut *self.state.lock(), SessionState::Closed);
        if previous.is_closed() {
            return false;
        }

        self.closed.cancel();
        // Drop a pending handshake callback along with whatever it captured
        self.on_initialized.lock().take();

        match previous {
            SessionState::Active(session_id) => {
                let callback = self.on_closed.lock().take();
                if let Some(callback) = callback {
                    callback(session_id.clone());
                }
                info!(session_id = %session_id, "Session closed");
            }
            _ => debug!("Transport closed before initialization"),
        }
        true
    }
}

impl std::fmt::Debug for SessionTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTransport")
            .field("state", &*self.state.lock())
            .field("connected", &self.service.get().is_some())
            .finish()
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| McpError::invalid_params(e.to_string()))
}

/// Receiving end of a session's notification stream.
///
/// Ends when the session closes.
pub struct Subscription {
    rx: broadcast::Receiver<JsonRpcNotification>,
    closed: CancellationToken,
}

impl Subscription {
    /// Wait for the next notification, or `None` once the session is closed.
    pub async fn next(&mut self) -> Option<JsonRpcNotification> {
        loop {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => return None,
                received = self.rx.recv() => match received {
                    Ok(notification) => return Some(notification),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                },
            }
        }
    }
}
