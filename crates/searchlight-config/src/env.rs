//! Environment variable overrides.
//!
//! Applied after the config files and before CLI flags. Both upper- and
//! lower-case proxy variables are honoured, upper-case first.

use crate::{ConfigError, Result, SearchlightConfig};

/// SearXNG base URL.
pub const SEARXNG_URL: &str = "SEARXNG_URL";
/// Basic-auth user name for SearXNG.
pub const AUTH_USERNAME: &str = "AUTH_USERNAME";
/// Basic-auth password for SearXNG.
pub const AUTH_PASSWORD: &str = "AUTH_PASSWORD";
/// Proxy for http URLs.
pub const HTTP_PROXY: &str = "HTTP_PROXY";
/// Proxy for https URLs.
pub const HTTPS_PROXY: &str = "HTTPS_PROXY";
/// Proxy bypass list.
pub const NO_PROXY: &str = "NO_PROXY";
/// User agent for outbound requests.
pub const USER_AGENT: &str = "USER_AGENT";
/// HTTP listen port.
pub const MCP_HTTP_PORT: &str = "MCP_HTTP_PORT";
/// HTTP bind address.
pub const MCP_HTTP_HOST: &str = "MCP_HTTP_HOST";

impl SearchlightConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_either = |key: &str| get(key).or_else(|| get(key.to_ascii_lowercase().as_str()));

        if let Some(url) = get(SEARXNG_URL) {
            self.searxng.get_or_insert_with(Default::default).url = Some(url);
        }
        if let Some(username) = get(AUTH_USERNAME) {
            self.searxng.get_or_insert_with(Default::default).username = Some(username);
        }
        if let Some(password) = get(AUTH_PASSWORD) {
            self.searxng.get_or_insert_with(Default::default).password = Some(password);
        }

        if let Some(http) = get_either(HTTP_PROXY) {
            self.proxy.get_or_insert_with(Default::default).http = Some(http);
        }
        if let Some(https) = get_either(HTTPS_PROXY) {
            self.proxy.get_or_insert_with(Default::default).https = Some(https);
        }
        if let Some(no_proxy) = get_either(NO_PROXY) {
            self.proxy.get_or_insert_with(Default::default).no_proxy = Some(no_proxy);
        }

        if let Some(user_agent) = get(USER_AGENT) {
            self.fetch.get_or_insert_with(Default::default).user_agent = Some(user_agent);
        }

        if let Some(port) = get(MCP_HTTP_PORT) {
            let port = port.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: MCP_HTTP_PORT.to_string(),
                value: port.clone(),
                reason: "expected a port number".to_string(),
            })?;
            self.server.get_or_insert_with(Default::default).port = port;
        }
        if let Some(host) = get(MCP_HTTP_HOST) {
            self.server.get_or_insert_with(Default::default).bind = host;
        }

        Ok(())
    }
}
