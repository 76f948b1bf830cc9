//! Startup validation of the effective configuration.

use url::Url;

use crate::{ConfigError, Result, SearchlightConfig};

impl SearchlightConfig {
    /// The SearXNG base URL, which must be set and use http or https.
    pub fn searxng_url(&self) -> Result<Url> {
        let raw = self.searxng().url.ok_or_else(|| ConfigError::MissingField {
            field: "searxng.url".to_string(),
            hint: "set SEARXNG_URL or [searxng] url".to_string(),
        })?;
        parse_http_url("searxng.url", &raw)
    }

    /// Check everything needed to start serving.
    pub fn validate(&self) -> Result<()> {
        self.searxng_url()?;

        let fetch = self.fetch();
        if fetch.timeout_secs == 0 {
            return Err(invalid("fetch.timeout_secs", "0", "must be at least 1"));
        }
        if fetch.cache_ttl_secs == 0 {
            return Err(invalid("fetch.cache_ttl_secs", "0", "must be at least 1"));
        }
        if fetch.max_size == 0 {
            return Err(invalid("fetch.max_size", "0", "must be at least 1"));
        }

        let proxy = self.proxy();
        if let Some(http) = &proxy.http {
            parse_http_url("proxy.http", http)?;
        }
        if let Some(https) = &proxy.https {
            parse_http_url("proxy.https", https)?;
        }

        let searxng = self.searxng();
        if searxng.password.is_some() && searxng.username.is_none() {
            return Err(ConfigError::MissingField {
                field: "searxng.username".to_string(),
                hint: "a password was given without AUTH_USERNAME".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_http_url(key: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| invalid(key, raw, &e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(key, raw, &format!("unsupported scheme '{}'", other))),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
