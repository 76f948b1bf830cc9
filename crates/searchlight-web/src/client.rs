//! Shared HTTP client construction (timeouts, user agent, proxies).

use std::time::Duration;

use reqwest::{Client, NoProxy, Proxy};
use tracing::debug;
use url::Url;

use crate::error::{Result, WebError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("Searchlight/", env!("CARGO_PKG_VERSION"));

/// Explicit proxy settings. Empty fields mean "connect directly".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// Proxy for `http://` URLs.
    pub http: Option<String>,
    /// Proxy for `https://` URLs.
    pub https: Option<String>,
    /// Comma-separated hosts that bypass the proxy.
    pub no_proxy: Option<String>,
}

impl ProxySettings {
    /// Whether any proxy is configured.
    pub fn is_enabled(&self) -> bool {
        self.http.is_some() || self.https.is_some()
    }

    /// Check that every configured proxy is an http(s) URL.
    pub fn validate(&self) -> Result<()> {
        for proxy in [&self.http, &self.https].into_iter().flatten() {
            let url = Url::parse(proxy).map_err(|e| WebError::Proxy(format!("{}: {}", proxy, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(WebError::Proxy(format!(
                    "{}: unsupported scheme '{}'",
                    proxy,
                    url.scheme()
                )));
            }
        }
        Ok(())
    }

    fn no_proxy(&self) -> Option<NoProxy> {
        self.no_proxy.as_deref().and_then(NoProxy::from_string)
    }
}

/// Settings for building an HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent header.
    pub user_agent: String,
    /// Proxies.
    pub proxy: ProxySettings,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: ProxySettings::default(),
        }
    }
}

impl HttpClientConfig {
    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the proxies.
    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = proxy;
        self
    }
}

/// Build a `reqwest` client from explicit settings.
///
/// System proxy detection is disabled; only the proxies in `config` apply.
pub fn build_client(config: &HttpClientConfig) -> Result<Client> {
    config.proxy.validate()?;

    let mut builder = Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent)
        .no_proxy();

    let no_proxy = config.proxy.no_proxy();
    if let Some(http) = &config.proxy.http {
        let proxy = Proxy::http(http)
            .map_err(|e| WebError::Proxy(e.to_string()))?
            .no_proxy(no_proxy.clone());
        builder = builder.proxy(proxy);
    }
    if let Some(https) = &config.proxy.https {
        let proxy = Proxy::https(https)
            .map_err(|e| WebError::Proxy(e.to_string()))?
            .no_proxy(no_proxy);
        builder = builder.proxy(proxy);
    }

    debug!(
        timeout_ms = config.timeout.as_millis() as u64,
        proxied = config.proxy.is_enabled(),
        "Building HTTP client"
    );

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("Searchlight/"));
        assert!(!config.proxy.is_enabled());
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_proxy_client() {
        let config = HttpClientConfig::default().with_proxy(ProxySettings {
            http: Some("http://proxy.local:3128".into()),
            https: Some("http://proxy.local:3128".into()),
            no_proxy: Some("localhost,127.0.0.1".into()),
        });
        assert!(config.proxy.is_enabled());
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let config = HttpClientConfig::default().with_proxy(ProxySettings {
            http: Some("not a url".into()),
            ..Default::default()
        });
        assert!(matches!(build_client(&config), Err(WebError::Proxy(_))));

        let config = HttpClientConfig::default().with_proxy(ProxySettings {
            https: Some("ftp://proxy.local".into()),
            ..Default::default()
        });
        assert!(matches!(build_client(&config), Err(WebError::Proxy(_))));
    }
}
