//! Path-based reverse proxy with optional response caching.
//!
//! Requests are matched against registered routes (literal prefixes or
//! regexes, with optional predicates), rewritten to a static, templated, or
//! computed target, forwarded, and returned as a normalized response.
//! Requests no route claims pass through to a wrapped service.
//!
//! ```no_run
//! use route_proxy::{ReverseProxyLayer, RouteOptions, RouteTable, Pattern};
//! use axum::Router;
//!
//! # fn main() -> Result<(), route_proxy::ProxyError> {
//! let mut table = RouteTable::new();
//! table.register("/static", "http://cdn.example.com", RouteOptions::new())?;
//! table.register(Pattern::regex(r"^/api/(\d+)")?, "http://backend/$1", RouteOptions::new())?;
//!
//! let app: Router<()> = Router::new().fallback(|| async { "not proxied" });
//! let service = tower::ServiceBuilder::new()
//!     .layer(ReverseProxyLayer::new(table))
//!     .service(app);
//! # let _ = service;
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod proxy;
pub mod routing;

// Response caching
pub mod cache;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use cache::{CacheStore, MemoryCacheStore};
pub use config::{GlobalOptions, MatchingMode, ProxyConfig, ResolvedOptions, RouteOptions};
pub use error::ProxyError;
pub use http::{HttpServer, ProxyBody, ProxyRequest, ProxyResponse};
pub use lifecycle::Shutdown;
pub use proxy::{ReverseProxy, ReverseProxyLayer};
pub use routing::{Pattern, RouteTable, Target};
