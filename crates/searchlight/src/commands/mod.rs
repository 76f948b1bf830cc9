//! CLI command handlers.

pub mod serve;
pub mod stdio;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use searchlight_cache::{CacheConfig, ContentCache};
use searchlight_config::{LoadOptions, SearchlightConfig};
use searchlight_mcp::SharedService;
use searchlight_web::{
    BasicAuth, CachedReader, HttpClientConfig, HttpFetcher, ProxySettings, SearchlightService,
    SearxngClient, build_client,
};
use tracing::{debug, info};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Everything a transport needs to serve the tools.
pub struct Components {
    /// The MCP service exposing search and URL reading.
    pub service: SharedService,
    /// The content cache behind `web_url_read`.
    pub cache: ContentCache,
}

/// Load the layered configuration: files, then environment.
///
/// Warnings about discovered files go to stderr; stdout is left alone.
pub fn load_config(config_file: Option<&Path>, ctx: &Context) -> Result<SearchlightConfig> {
    let loaded = searchlight_config::load_config_with_options(&LoadOptions {
        config_file: config_file.map(Path::to_path_buf),
        ..Default::default()
    })
    .context("Failed to load configuration")?;

    for warning in &loaded.warnings {
        eprintln!("warning: {}", warning);
    }
    if ctx.verbose {
        for path in loaded.loaded_from() {
            eprintln!("Loaded config from {}", path.display());
        }
    }

    let mut config = loaded.config;
    config
        .apply_env()
        .context("Invalid environment override")?;
    Ok(config)
}

/// Validate `config` and wire the HTTP client, backends and cache.
///
/// Must run inside the runtime; the cache sweep is spawned here.
pub fn build_components(config: &SearchlightConfig) -> Result<Components> {
    config.validate()?;

    let fetch = config.fetch();
    let proxy = config.proxy();
    let proxy = ProxySettings {
        http: proxy.http,
        https: proxy.https,
        no_proxy: proxy.no_proxy,
    };
    if proxy.is_enabled() {
        debug!(
            http = ?proxy.http,
            https = ?proxy.https,
            no_proxy = ?proxy.no_proxy,
            "Using proxy"
        );
    }

    let mut http_config = HttpClientConfig::default()
        .with_timeout(fetch.timeout())
        .with_proxy(proxy);
    if let Some(user_agent) = fetch.user_agent.clone() {
        http_config = http_config.with_user_agent(user_agent);
    }
    let client = build_client(&http_config).context("Failed to build HTTP client")?;

    let searxng = config.searxng();
    let searxng_url = config.searxng_url()?;
    let auth = searxng.username.clone().map(|username| BasicAuth {
        username,
        password: searxng.password.clone().unwrap_or_default(),
    });
    let search = SearxngClient::new(client.clone(), searxng_url.as_str())?.with_auth(auth);

    let fetcher = HttpFetcher::new(client)
        .with_timeout(fetch.timeout())
        .with_max_size(fetch.max_size);

    let mut cache_config = CacheConfig::new(fetch.cache_ttl());
    if let Some(interval) = fetch.sweep_interval() {
        cache_config = cache_config.with_sweep_interval(interval);
    }
    let cache = ContentCache::new(cache_config).context("Failed to create content cache")?;

    let reader = CachedReader::new(cache.clone(), Arc::new(fetcher));
    let service = SearchlightService::new(Arc::new(search), reader)
        .with_config_snapshot(config.redacted_snapshot());

    info!(
        searxng = %searxng_url,
        cache_ttl_secs = fetch.cache_ttl_secs,
        timeout_secs = fetch.timeout_secs,
        "Service ready"
    );

    Ok(Components {
        service: Arc::new(service),
        cache,
    })
}
