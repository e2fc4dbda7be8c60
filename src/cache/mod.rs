//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route + request path
//!     → mod.rs (store configured? path exempt? → cache key)
//!     → CacheStore::fetch(key, forward)
//!         hit  → stored response
//!         miss → forward to backend, store persists result
//!     → rewrite `date`, tag with `x-reverse-proxy-cache-key`
//! ```
//!
//! # Design Decisions
//! - The decorator does no locking; stores coalesce concurrent misses per key
//! - Failed forwards are never stored
//! - Exemptions are plain substrings of the request path
//! - Only GET goes through the store; other methods always reach the backend

pub mod memory;

use std::fmt;
use std::future::Future;

use axum::http::Method;
use chrono::Utc;
use futures_util::future::BoxFuture;

use crate::config::options::ResolvedOptions;
use crate::error::ProxyError;
use crate::http::response::ProxyResponse;
use crate::observability::metrics;

pub use memory::MemoryCacheStore;

/// Header carrying the key a cached response was stored under.
pub const CACHE_KEY_HEADER: &str = "x-reverse-proxy-cache-key";

/// Deferred computation of a response on a cache miss.
pub type Compute<'a> = BoxFuture<'a, Result<ProxyResponse, ProxyError>>;

/// A response store with fetch-or-compute semantics.
///
/// Implementations must run `compute` only on a miss, persist its successful
/// result under `key` before returning it, and ensure concurrent fetches of
/// one key share a single computation.
pub trait CacheStore: Send + Sync + fmt::Debug {
    fn fetch<'a>(&'a self, key: &'a str, compute: Compute<'a>) -> Compute<'a>;
}

/// True when `path` contains any exemption substring.
pub fn is_exempt(path: &str, exemptions: &[String]) -> bool {
    exemptions
        .iter()
        .any(|exemption| !exemption.is_empty() && path.contains(exemption.as_str()))
}

/// Key a response for `path` is cached under.
pub fn cache_key(path: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(namespace) => format!("{}/{}", namespace, path),
        None => path.to_string(),
    }
}

/// Current time as an HTTP date (IMF-fixdate).
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Run `forward` through the route's cache store when caching applies.
pub async fn maybe_cached_forward<'a, F>(
    options: &'a ResolvedOptions,
    method: &Method,
    path: &str,
    forward: F,
) -> Result<ProxyResponse, ProxyError>
where
    F: Future<Output = Result<ProxyResponse, ProxyError>> + Send + 'a,
{
    let Some(store) = options.cache.as_ref() else {
        return forward.await;
    };
    if *method != Method::GET {
        tracing::debug!(method = %method, path = %path, "Cache bypassed for non-GET request");
        return forward.await;
    }
    if is_exempt(path, &options.cache_exemptions) {
        tracing::debug!(path = %path, "Cache bypassed for exempt path");
        metrics::record_cache_bypass();
        return forward.await;
    }

    let key = cache_key(path, options.cache_namespace.as_deref());
    let mut response = store.fetch(&key, Box::pin(forward)).await?;
    response.set_header("date", http_date());
    response.set_header(CACHE_KEY_HEADER, key.as_str());

    tracing::debug!(key = %key, status = response.status, "Served through cache");
    Ok(response)
}
