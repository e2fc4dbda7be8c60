//! Route matching logic.
//!
//! # Responsibilities
//! - Compile route patterns once, at registration
//! - Match a request path against a pattern and expose its capture groups
//! - Provide request conditions usable as route predicates (host matching)
//!
//! # Design Decisions
//! - Literal patterns are prefix matches anchored at the start of the path
//! - Regex patterns get no implicit anchoring
//! - Host matching ignores case; path matching does not

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::config::options::Predicate;
use crate::error::ProxyError;
use crate::http::request::ProxyRequest;

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches any path starting with the prefix.
    Literal(String),
    /// Matches anywhere the expression matches.
    Regex(Regex),
}

impl Pattern {
    /// Create a prefix pattern.
    pub fn literal(prefix: impl Into<String>) -> Self {
        Pattern::Literal(prefix.into())
    }

    /// Compile a regex pattern.
    pub fn regex(source: &str) -> Result<Self, ProxyError> {
        Regex::new(source)
            .map(Pattern::Regex)
            .map_err(|source_err| ProxyError::InvalidPattern {
                pattern: source.to_string(),
                source: source_err,
            })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Pattern::Literal(_))
    }

    /// The pattern source text.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Literal(prefix) => prefix,
            Pattern::Regex(re) => re.as_str(),
        }
    }

    /// Match `path`, returning its captures on success.
    pub fn captures(&self, path: &str) -> Option<PathCaptures> {
        match self {
            Pattern::Literal(prefix) => path.starts_with(prefix.as_str()).then(|| PathCaptures {
                groups: vec![prefix.clone()],
                start: 0,
                end: prefix.len(),
            }),
            Pattern::Regex(re) => {
                let caps = re.captures(path)?;
                let whole = caps.get(0)?;
                let groups = caps
                    .iter()
                    .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect();
                Some(PathCaptures {
                    groups,
                    start: whole.start(),
                    end: whole.end(),
                })
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Pattern {
    fn from(prefix: &str) -> Self {
        Pattern::literal(prefix)
    }
}

impl From<String> for Pattern {
    fn from(prefix: String) -> Self {
        Pattern::Literal(prefix)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Pattern::Regex(re)
    }
}

/// Capture groups from a successful match.
///
/// Group 0 is the whole match; unmatched optional groups are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCaptures {
    groups: Vec<String>,
    start: usize,
    end: usize,
}

impl PathCaptures {
    /// Capture group `index`, if the pattern has that many groups.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).map(String::as_str)
    }

    /// Number of groups including group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The part of `path` not consumed by a match anchored at its start.
    ///
    /// Matches that begin later in the path consume nothing.
    pub fn remainder<'p>(&self, path: &'p str) -> &'p str {
        if self.start == 0 {
            path.get(self.end..).unwrap_or("")
        } else {
            path
        }
    }
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &ProxyRequest) -> bool;
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }

    /// Wrap this matcher as a route predicate.
    pub fn into_predicate(self) -> Predicate {
        Arc::new(move |req: &ProxyRequest| self.matches(req))
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &ProxyRequest) -> bool {
        req.authority()
            .map(|h| h.to_lowercase() == self.expected_host)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn test_literal_is_anchored_prefix() {
        let pattern = Pattern::literal("/api");

        let caps = pattern.captures("/api/v1").unwrap();
        assert_eq!(caps.get(0), Some("/api"));
        assert_eq!(caps.remainder("/api/v1"), "/v1");

        assert!(pattern.captures("/v1/api").is_none());
        assert!(pattern.captures("/images").is_none());
    }

    #[test]
    fn test_regex_groups() {
        let pattern = Pattern::regex(r"/api/(\d+)(/x)?").unwrap();

        let caps = pattern.captures("/api/42").unwrap();
        assert_eq!(caps.get(0), Some("/api/42"));
        assert_eq!(caps.get(1), Some("42"));
        assert_eq!(caps.get(2), Some(""));
        assert_eq!(caps.len(), 3);
    }

    #[test]
    fn test_regex_is_not_implicitly_anchored() {
        let pattern = Pattern::regex(r"/v\d").unwrap();

        let caps = pattern.captures("/api/v2/items").unwrap();
        assert_eq!(caps.get(0), Some("/v2"));
        // not anchored at the start, so nothing is consumed
        assert_eq!(caps.remainder("/api/v2/items"), "/api/v2/items");
    }

    #[test]
    fn test_invalid_regex() {
        let err = Pattern::regex("/api/(").unwrap_err();
        assert!(matches!(err, ProxyError::InvalidPattern { .. }));
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        let req1 = ProxyRequest::from_http(
            Request::builder()
                .header("Host", "example.com")
                .body(Body::empty())
                .unwrap(),
        );
        assert!(matcher.matches(&req1));

        let req2 = ProxyRequest::from_http(
            Request::builder()
                .header("Host", "EXAMPLE.COM")
                .body(Body::empty())
                .unwrap(),
        );
        assert!(matcher.matches(&req2)); // Case insensitive

        let req3 = ProxyRequest::from_http(
            Request::builder()
                .header("Host", "other.com")
                .body(Body::empty())
                .unwrap(),
        );
        assert!(!matcher.matches(&req3));
        assert!(!matcher.into_predicate()(&req3));
    }
}
