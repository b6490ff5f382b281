//! API client configuration and base-address resolution

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ApiError, Result};

/// Environment variable overriding the resolved base address
pub const BASE_URL_ENV: &str = "CANVASS_API_URL";

/// Loopback default used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Explicit base address; set this to skip resolution entirely
    #[serde(default)]
    pub base_url: Option<String>,

    /// Origin the dashboard is served from, used when `base_url` and the
    /// environment override are absent
    #[serde(default)]
    pub origin: Option<String>,

    /// Treat `origin` as the API address itself (a dev proxy forwards
    /// `/api` there); otherwise the API lives on `origin`'s host at
    /// `api_port`
    #[serde(default)]
    pub origin_is_proxy: bool,

    /// Backend port on the origin host when not in proxy mode
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Request timeout
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Custom user agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Token refresh endpoint, relative to the base address
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Path prefix under which 401s are never refresh-eligible
    #[serde(default = "default_auth_prefix")]
    pub auth_prefix: String,

    /// Cookie the CSRF token is read from
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,

    /// Header the CSRF token is echoed back on
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            origin: None,
            origin_is_proxy: false,
            api_port: default_api_port(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            refresh_path: default_refresh_path(),
            auth_prefix: default_auth_prefix(),
            csrf_cookie: default_csrf_cookie(),
            csrf_header: default_csrf_header(),
        }
    }
}

impl ApiConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit base address
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the dashboard origin for derived resolution
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Route API calls through the origin itself (dev-proxy mode)
    pub fn with_proxy_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self.origin_is_proxy = true;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolve the base address once, in priority order: explicit value,
    /// environment override, origin (proxy mode or alternate port), and
    /// finally the loopback default.
    pub fn resolve_base_url(&self) -> Result<Url> {
        if let Some(explicit) = &self.base_url {
            return parse_base(explicit);
        }

        if let Ok(value) = std::env::var(BASE_URL_ENV) {
            if !value.trim().is_empty() {
                return parse_base(value.trim());
            }
        }

        if let Some(origin) = &self.origin {
            let mut url = parse_base(origin)?;
            if self.origin_is_proxy {
                return Ok(url);
            }
            url.set_port(Some(self.api_port))
                .map_err(|()| ApiError::InvalidBaseUrl(origin.clone()))?;
            url.set_path("");
            return Ok(url);
        }

        parse_base(DEFAULT_BASE_URL)
    }
}

fn parse_base(value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| ApiError::InvalidBaseUrl(format!("{value}: {e}")))
}

// Default value functions for serde
fn default_api_port() -> u16 {
    8000
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("Canvass/{}", env!("CARGO_PKG_VERSION"))
}

fn default_refresh_path() -> String {
    "/api/auth/refresh".to_string()
}

fn default_auth_prefix() -> String {
    "/api/auth/".to_string()
}

fn default_csrf_cookie() -> String {
    "csrftoken".to_string()
}

fn default_csrf_header() -> String {
    "X-CSRFToken".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.api_port, 8000);
        assert_eq!(config.refresh_path, "/api/auth/refresh");
        assert_eq!(config.csrf_cookie, "csrftoken");
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = ApiConfig::new()
            .with_base_url("https://api.example.org")
            .with_origin("https://dash.example.org");
        let url = config.resolve_base_url().unwrap();
        assert_eq!(url.as_str(), "https://api.example.org/");
    }

    #[test]
    fn test_origin_alternate_port() {
        let config = ApiConfig::new().with_origin("http://192.168.1.20:3000");
        let url = config.resolve_base_url().unwrap();
        assert_eq!(url.host_str(), Some("192.168.1.20"));
        assert_eq!(url.port(), Some(8000));
    }

    #[test]
    fn test_proxy_origin_used_directly() {
        let config = ApiConfig::new().with_proxy_origin("http://localhost:3000");
        let url = config.resolve_base_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_loopback_fallback() {
        let config = ApiConfig::default();
        let url = config.resolve_base_url().unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ApiConfig::new().with_base_url("not a url");
        assert!(matches!(
            config.resolve_base_url(),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ApiConfig::new().with_base_url("http://10.0.0.5:8000");
        let json = serde_json::to_string(&config).unwrap();
        let back: ApiConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_url.as_deref(), Some("http://10.0.0.5:8000"));
        assert_eq!(back.timeout, config.timeout);
    }
}
