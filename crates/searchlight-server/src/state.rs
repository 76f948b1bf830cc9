//! Application state shared across handlers.

use std::sync::Arc;

use searchlight_cache::ContentCache;
use searchlight_mcp::SharedService;

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Live sessions.
    pub sessions: SessionRegistry,

    /// Backend service bound to every new session.
    pub service: SharedService,

    /// Content cache, reported by the health endpoint and stopped on shutdown.
    pub cache: Option<ContentCache>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: SharedService, config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionRegistry::new(),
            service,
            cache: None,
        }
    }

    /// Attach the content cache.
    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Close every session and stop the cache sweep.
    pub fn shutdown(&self) {
        self.sessions.close_all();
        if let Some(cache) = &self.cache {
            cache.shutdown();
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
