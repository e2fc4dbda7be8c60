//! Target URI resolution.
//!
//! # Responsibilities
//! - Classify targets at registration (static, templated, dynamic)
//! - Substitute `$N` placeholders from pattern captures
//! - Join non-templated targets with the unconsumed request path
//!
//! # Design Decisions
//! - A placeholder index resolves to the longest digit run naming an existing group,
//!   so `$10` means group 10 only when the pattern has eleven groups
//! - Placeholders naming no group are left as written
//! - Templated results must be absolute URIs with a host

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::ProxyError;
use crate::http::request::ProxyRequest;
use crate::routing::matcher::PathCaptures;

/// Computes a target string from the inbound request.
pub type TargetFn = Arc<dyn Fn(&ProxyRequest) -> String + Send + Sync>;

/// Where a route sends its traffic.
#[derive(Clone)]
pub enum Target {
    /// A base URI joined with the request path.
    Static(String),
    /// A URI template with `$N` placeholders.
    Templated(String),
    /// A target computed per request.
    Dynamic(TargetFn),
}

impl Target {
    /// Classify a target string.
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        if has_placeholders(&target) {
            Target::Templated(target)
        } else {
            Target::Static(target)
        }
    }

    /// A target computed from each request.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&ProxyRequest) -> String + Send + Sync + 'static,
    {
        Target::Dynamic(Arc::new(f))
    }

    /// Human-readable summary for diagnostics.
    pub fn summary(&self) -> String {
        match self {
            Target::Static(s) | Target::Templated(s) => s.clone(),
            Target::Dynamic(_) => "<dynamic>".to_string(),
        }
    }

    /// Resolve the destination URI for a matched request.
    pub fn resolve(
        &self,
        path: &str,
        captures: &PathCaptures,
        request: &ProxyRequest,
    ) -> Result<Url, ProxyError> {
        let base = match self {
            Target::Static(s) | Target::Templated(s) => s.clone(),
            Target::Dynamic(f) => f(request),
        };

        if has_placeholders(&base) {
            let substituted = substitute(&base, captures);
            parse_absolute(&substituted)
        } else {
            join(&base, captures.remainder(path))
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Target::Templated(s) => f.debug_tuple("Templated").field(s).finish(),
            Target::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Target {
    fn from(target: &str) -> Self {
        Target::new(target)
    }
}

impl From<String> for Target {
    fn from(target: String) -> Self {
        Target::new(target)
    }
}

/// True when `target` contains `$` followed by a digit.
pub fn has_placeholders(target: &str) -> bool {
    target
        .as_bytes()
        .windows(2)
        .any(|w| w[0] == b'$' && w[1].is_ascii_digit())
}

/// True when `target` parses as an absolute URI with a host.
pub fn is_absolute(target: &str) -> bool {
    Url::parse(target).map(|url| url.has_host()).unwrap_or(false)
}

fn substitute(template: &str, captures: &PathCaptures) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();

        let group = (1..=digits).rev().find_map(|len| {
            let index: usize = after[..len].parse().ok()?;
            captures.get(index).map(|value| (len, value))
        });

        match group {
            Some((len, value)) => {
                out.push_str(value);
                rest = &after[len..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn parse_absolute(target: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(target).map_err(|e| ProxyError::InvalidTarget {
        target: target.to_string(),
        reason: e.to_string(),
    })?;
    if !url.has_host() {
        return Err(ProxyError::InvalidTarget {
            target: target.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

fn join(base: &str, remainder: &str) -> Result<Url, ProxyError> {
    let mut url = parse_absolute(base)?;

    let (path, query) = match remainder.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (remainder, None),
    };

    if !path.is_empty() {
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
    }
    if let Some(query) = query {
        url.set_query(Some(query));
    }

    Ok(url)
}
