//! Error types for the proxy core.
//!
//! Every failure the core can produce is a variant of [`ProxyError`]; callers
//! branch on the variant rather than on message text.

use std::fmt;

use axum::http::{Method, StatusCode};
use thiserror::Error;

/// Boxed error returned by a wrapped fallback service.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Short description of a registered route, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    /// Pattern source (literal prefix or regex).
    pub pattern: String,
    /// Target summary (`<dynamic>` for computed targets).
    pub target: String,
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.pattern, self.target)
    }
}

fn describe_all(matches: &[RouteDescriptor]) -> String {
    matches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while registering routes or proxying a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A literal target without scheme or host was registered for a literal pattern.
    #[error("target `{target}` for `{pattern}` is not an absolute URI (did you mean `http://{target}`?)")]
    GenericTarget { pattern: String, target: String },

    /// More than one route matched while uniqueness was required.
    #[error("ambiguous match for `{path}`: {}", describe_all(.matches))]
    AmbiguousMatch {
        path: String,
        matches: Vec<RouteDescriptor>,
    },

    /// The request method cannot be forwarded.
    #[error("unsupported method {0}")]
    UnsupportedMethod(Method),

    /// The resolved target is not a valid absolute URI.
    #[error("invalid target `{target}`: {reason}")]
    InvalidTarget { target: String, reason: String },

    /// A regex pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A non-seekable request body did not declare its length.
    #[error("request body has no declared length")]
    MissingContentLength,

    /// The inbound request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// The upstream HTTP client could not be constructed.
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connecting to, writing to, or reading from the backend failed.
    #[error("upstream request to {uri} failed: {source}")]
    Transport {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// The wrapped fallback service failed.
    #[error("fallback handler failed: {0}")]
    Fallback(#[source] BoxError),
}

impl ProxyError {
    /// Client-visible status code for hosts that render errors directly.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::MissingContentLength => StatusCode::LENGTH_REQUIRED,
            ProxyError::Body(_) => StatusCode::BAD_REQUEST,
            ProxyError::Transport { source, .. } if source.is_timeout() => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ProxyError::Transport { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidTarget { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::GenericTarget { .. }
            | ProxyError::AmbiguousMatch { .. }
            | ProxyError::InvalidPattern { .. }
            | ProxyError::Client(_)
            | ProxyError::Fallback(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
