//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use searchlight_cache::{CacheConfig, ContentCache};
use searchlight_server::{AppState, SESSION_ID_HEADER, Server, ServerConfig, SessionRegistry};
use searchlight_web::{
    CachedReader, HttpClientConfig, HttpFetcher, SearchlightService, SearxngClient, build_client,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use wiremock::MockServer;

/// A test server that runs in the background.
///
/// The SearXNG instance and every fetched page are served by `upstream`.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client for talking to the server.
    pub client: Client,
    /// Mock SearXNG instance and web pages.
    pub upstream: MockServer,
    /// The server's session registry.
    pub sessions: SessionRegistry,
    /// The server's content cache.
    pub cache: ContentCache,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<searchlight_server::Result<()>>,
}

impl TestServer {
    /// Start a new test server with a 60s cache TTL.
    pub async fn start() -> Result<Self> {
        let upstream = MockServer::start().await;

        let http = build_client(&HttpClientConfig::default().with_timeout(Duration::from_secs(5)))?;
        let search = SearxngClient::new(http.clone(), &upstream.uri())?;
        let fetcher = HttpFetcher::new(http).with_timeout(Duration::from_secs(5));

        let cache = ContentCache::new(CacheConfig::new(Duration::from_secs(60)))?;
        let reader = CachedReader::new(cache.clone(), Arc::new(fetcher));
        let service = SearchlightService::new(Arc::new(search), reader);

        let config = ServerConfig::new().with_request_logging(false);
        let state = AppState::new(Arc::new(service), config).with_cache(cache.clone());
        let server = Server::from_state(state);
        let sessions = server.state().sessions.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        Ok(Self {
            addr,
            client: Client::builder().no_proxy().build()?,
            upstream,
            sessions,
            cache,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// POST a JSON-RPC body to `/mcp`.
    pub async fn post(&self, session_id: Option<&str>, body: &Value) -> Result<Response> {
        let mut request = self
            .client
            .post(format!("{}/mcp", self.base_url()))
            .header("accept", "application/json, text/event-stream")
            .json(body);
        if let Some(id) = session_id {
            request = request.header(SESSION_ID_HEADER, id);
        }
        Ok(request.send().await?)
    }

    /// Open the notification stream of a session.
    pub async fn open_stream(&self, session_id: Option<&str>) -> Result<Response> {
        let mut request = self
            .client
            .get(format!("{}/mcp", self.base_url()))
            .header("accept", "text/event-stream");
        if let Some(id) = session_id {
            request = request.header(SESSION_ID_HEADER, id);
        }
        Ok(request.send().await?)
    }

    /// DELETE a session.
    pub async fn delete(&self, session_id: Option<&str>) -> Result<Response> {
        let mut request = self.client.delete(format!("{}/mcp", self.base_url()));
        if let Some(id) = session_id {
            request = request.header(SESSION_ID_HEADER, id);
        }
        Ok(request.send().await?)
    }

    /// Perform the handshake and return the new session id.
    pub async fn initialize(&self) -> Result<String> {
        let response = self.post(None, &initialize_request(1)).await?;
        anyhow::ensure!(
            response.status().is_success(),
            "initialize failed: {}",
            response.status()
        );
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .context("missing session header")?
            .to_str()?
            .to_string();

        let initialized = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let response = self.post(Some(&session_id), &initialized).await?;
        anyhow::ensure!(response.status().as_u16() == 202, "initialized not accepted");

        Ok(session_id)
    }

    /// Call a tool and return the JSON-RPC response body.
    pub async fn call_tool(&self, session_id: &str, id: i64, name: &str, arguments: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        });
        Ok(self.post(Some(session_id), &body).await?.json().await?)
    }

    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .context("server did not stop")???;
        Ok(())
    }
}

/// A well-formed `initialize` request.
pub fn initialize_request(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "integration-test", "version": "1.0.0"}
        }
    })
}
