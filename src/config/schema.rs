//! Configuration schema definitions.
//!
//! This module defines the configuration file structure for the proxy server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::config::options::MatchingMode;

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Global proxy options, overridable per route.
    pub options: OptionsConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions, matched in file order.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body buffered when no content length is declared.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Global proxy options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Rewrite `Host` to the target authority.
    pub preserve_host: bool,

    /// Add `X-Forwarded-Host` with the original authority.
    pub x_forwarded_host: bool,

    /// `first` or `all_unique`.
    pub matching_mode: MatchingMode,

    /// Verify upstream TLS certificates.
    pub verify_ssl: bool,

    /// Connect timeout in seconds.
    pub open_timeout_secs: Option<u64>,

    /// Read timeout in seconds.
    pub timeout_secs: Option<u64>,

    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            preserve_host: true,
            x_forwarded_host: true,
            matching_mode: MatchingMode::AllUnique,
            verify_ssl: true,
            open_timeout_secs: None,
            timeout_secs: None,
            username: None,
            password: None,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache every route unless it opts out.
    pub enabled: bool,

    /// Seconds before a stored response is recomputed (unset = never).
    pub ttl_secs: Option<u64>,

    /// Key prefix.
    pub namespace: Option<String>,

    /// Path substrings that are never cached.
    pub exemptions: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A route mapping a path pattern to a target.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Path prefix to match.
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Path regex to match (unanchored).
    #[serde(default)]
    pub path_regex: Option<String>,

    /// Target URI; may contain `$N` placeholders.
    pub target: String,

    /// Host header to match (exact match, case-insensitive).
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub preserve_host: Option<bool>,
    #[serde(default)]
    pub x_forwarded_host: Option<bool>,
    #[serde(default)]
    pub verify_ssl: Option<bool>,
    #[serde(default)]
    pub open_timeout_secs: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// Cache this route's responses (defaults to `cache.enabled`).
    #[serde(default)]
    pub cache: Option<bool>,
    #[serde(default)]
    pub cache_namespace: Option<String>,
    #[serde(default)]
    pub cache_exemptions: Option<Vec<String>>,
}
