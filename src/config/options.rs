//! Proxy options: global defaults, per-route overrides, and their merge.
//!
//! # Design Decisions
//! - Global options are fixed when the route table is built
//! - Each route merges its overrides over the globals exactly once, at registration
//! - Resolved options are immutable and shared read-only across requests

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStore;
use crate::http::request::ProxyRequest;

/// Request predicate consulted after a route's pattern matches.
pub type Predicate = Arc<dyn Fn(&ProxyRequest) -> bool + Send + Sync>;

/// Policy applied when several routes match one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    /// The earliest-registered match wins.
    First,
    /// More than one match is an error.
    #[default]
    AllUnique,
}

/// Options set once for the whole route table.
#[derive(Clone)]
pub struct GlobalOptions {
    /// Rewrite the outbound `Host` header to the target authority.
    pub preserve_host: bool,
    /// Send the original authority as `X-Forwarded-Host`.
    pub x_forwarded_host: bool,
    /// How multiple matches are resolved.
    pub matching_mode: MatchingMode,
    /// Verify upstream TLS certificates.
    pub verify_ssl: bool,
    /// Default connect timeout.
    pub open_timeout: Option<Duration>,
    /// Default read timeout.
    pub timeout: Option<Duration>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Default cache store.
    pub cache: Option<Arc<dyn CacheStore>>,
    pub cache_namespace: Option<String>,
    pub cache_exemptions: Vec<String>,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            preserve_host: true,
            x_forwarded_host: true,
            matching_mode: MatchingMode::AllUnique,
            verify_ssl: true,
            open_timeout: None,
            timeout: None,
            username: None,
            password: None,
            cache: None,
            cache_namespace: None,
            cache_exemptions: Vec::new(),
        }
    }
}

impl fmt::Debug for GlobalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalOptions")
            .field("preserve_host", &self.preserve_host)
            .field("x_forwarded_host", &self.x_forwarded_host)
            .field("matching_mode", &self.matching_mode)
            .field("verify_ssl", &self.verify_ssl)
            .field("open_timeout", &self.open_timeout)
            .field("timeout", &self.timeout)
            .field("username", &self.username)
            .field("cache", &self.cache)
            .field("cache_namespace", &self.cache_namespace)
            .field("cache_exemptions", &self.cache_exemptions)
            .finish_non_exhaustive()
    }
}

/// Per-route overrides. Unset fields fall back to [`GlobalOptions`].
#[derive(Clone, Default)]
pub struct RouteOptions {
    pub preserve_host: Option<bool>,
    pub x_forwarded_host: Option<bool>,
    pub verify_ssl: Option<bool>,
    pub open_timeout: Option<Duration>,
    pub timeout: Option<Duration>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub cache_namespace: Option<String>,
    pub cache_exemptions: Option<Vec<String>>,
    /// Extra condition a request must satisfy for the route to match.
    pub predicate: Option<Predicate>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only match requests for which `predicate` returns true.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ProxyRequest) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Cache responses for this route in `store`.
    pub fn cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Send HTTP basic credentials upstream.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Merge these overrides over `global`.
    pub fn resolve(self, global: &GlobalOptions) -> ResolvedOptions {
        let username = self.username.or_else(|| global.username.clone());
        let password = self.password.or_else(|| global.password.clone());
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        ResolvedOptions {
            preserve_host: self.preserve_host.unwrap_or(global.preserve_host),
            x_forwarded_host: self.x_forwarded_host.unwrap_or(global.x_forwarded_host),
            verify_ssl: self.verify_ssl.unwrap_or(global.verify_ssl),
            open_timeout: self.open_timeout.or(global.open_timeout),
            timeout: self.timeout.or(global.timeout),
            credentials,
            cache: self.cache.or_else(|| global.cache.clone()),
            cache_namespace: self.cache_namespace.or_else(|| global.cache_namespace.clone()),
            cache_exemptions: self
                .cache_exemptions
                .unwrap_or_else(|| global.cache_exemptions.clone()),
            predicate: self.predicate,
        }
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("preserve_host", &self.preserve_host)
            .field("x_forwarded_host", &self.x_forwarded_host)
            .field("verify_ssl", &self.verify_ssl)
            .field("open_timeout", &self.open_timeout)
            .field("timeout", &self.timeout)
            .field("username", &self.username)
            .field("cache", &self.cache)
            .field("cache_namespace", &self.cache_namespace)
            .field("cache_exemptions", &self.cache_exemptions)
            .field("predicate", &self.predicate.is_some())
            .finish_non_exhaustive()
    }
}

/// HTTP basic credentials; present only when both parts are configured.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Effective options for a single route.
#[derive(Clone)]
pub struct ResolvedOptions {
    pub preserve_host: bool,
    pub x_forwarded_host: bool,
    pub verify_ssl: bool,
    pub open_timeout: Option<Duration>,
    pub timeout: Option<Duration>,
    pub credentials: Option<Credentials>,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub cache_namespace: Option<String>,
    pub cache_exemptions: Vec<String>,
    pub predicate: Option<Predicate>,
}

impl ResolvedOptions {
    /// Evaluate the route predicate; routes without one accept every request.
    pub fn accepts(&self, request: &ProxyRequest) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(request))
    }
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("preserve_host", &self.preserve_host)
            .field("x_forwarded_host", &self.x_forwarded_host)
            .field("verify_ssl", &self.verify_ssl)
            .field("open_timeout", &self.open_timeout)
            .field("timeout", &self.timeout)
            .field("credentials", &self.credentials)
            .field("cache", &self.cache)
            .field("cache_namespace", &self.cache_namespace)
            .field("cache_exemptions", &self.cache_exemptions)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_overrides_global() {
        let global = GlobalOptions {
            timeout: Some(Duration::from_secs(30)),
            cache_namespace: Some("global".into()),
            ..Default::default()
        };
        let route = RouteOptions {
            preserve_host: Some(false),
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        let resolved = route.resolve(&global);
        assert!(!resolved.preserve_host);
        assert!(resolved.x_forwarded_host);
        assert!(resolved.verify_ssl);
        assert_eq!(resolved.timeout, Some(Duration::from_secs(5)));
        assert_eq!(resolved.cache_namespace.as_deref(), Some("global"));
        assert!(resolved.cache_exemptions.is_empty());
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let global = GlobalOptions {
            username: Some("admin".into()),
            ..Default::default()
        };
        assert!(RouteOptions::new().resolve(&global).credentials.is_none());

        let resolved = RouteOptions {
            password: Some("secret".into()),
            ..Default::default()
        }
        .resolve(&global);
        assert_eq!(
            resolved.credentials,
            Some(Credentials { username: "admin".into(), password: "secret".into() })
        );
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials { username: "u".into(), password: "hunter2".into() };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
