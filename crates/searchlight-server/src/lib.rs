//! MCP Streamable HTTP server for Searchlight.
//!
//! This crate owns the session multiplexer: it maps the `Mcp-Session-Id`
//! header to a per-session [`SessionTransport`](searchlight_mcp::SessionTransport),
//! creates transports for `initialize` handshakes and drops them from the
//! registry when they close.
//!
//! # Endpoints
//!
//! - `POST /mcp`: JSON-RPC messages for a session (or a handshake)
//! - `GET /mcp`: SSE stream of server notifications
//! - `DELETE /mcp`: end a session
//! - `GET /health`: status, version and active session count
//!
//! # Example
//!
//! ```ignore
//! use searchlight_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::new().with_bind_address("127.0.0.1:3000".parse()?);
//! let server = Server::new(service, config);
//! server.run_until(tokio::signal::ctrl_c().map(|_| ())).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use middleware::request_logging_middleware;
pub use registry::SessionRegistry;
pub use routes::{HealthResponse, SESSION_ID_HEADER};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::{Router, middleware as axum_middleware};
use searchlight_mcp::SharedService;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The Searchlight HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server for `service`.
    pub fn new(service: SharedService, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(service, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// The shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .merge(routes::mcp_routes())
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins = &self.state.config.cors_origins;
        if origins.is_empty() {
            return None;
        }

        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        let session_header = HeaderName::from_static(SESSION_ID_HEADER);
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers(Any)
                .expose_headers([session_header]),
        )
    }

    /// Run the server on the configured address until the process exits.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let listener = bind(addr).await?;
        self.serve(listener, std::future::pending()).await
    }

    /// Run on the configured address until `shutdown` resolves.
    pub async fn run_until(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = bind(self.state.config.bind_address).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// On shutdown every session is closed, which ends open notification
    /// streams so in-flight connections can drain, and the cache sweep is
    /// stopped.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Failed to read local address: {}", e)))?;
        info!(addr = %local_addr, "Starting server");

        let router = self.router();
        let state = self.state.clone();
        let signal = async move {
            shutdown.await;
            info!(sessions = state.sessions.len(), "Shutting down");
            state.shutdown();
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        // Sessions opened while draining
        self.state.shutdown();
        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> std::net::SocketAddr {
        self.state.config.bind_address
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))
}
