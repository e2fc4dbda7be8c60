//! Proxy facade.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → ProxyRequest (parts kept verbatim)
//!     → RouteTable::resolve
//!         no match → inner service receives the original request
//!     → Target::resolve (destination URI)
//!     → cache::maybe_cached_forward
//!     → forwarder::forward
//!     → ProxyResponse → Response<Body>
//! ```
//!
//! # Design Decisions
//! - Exposed as a tower `Layer` so any service can be the fallback
//! - Errors are returned to the caller, never rendered here
//! - Bodies without a declared length are buffered (bounded) once a route matches

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::cache;
use crate::error::{BoxError, ProxyError};
use crate::http::forwarder;
use crate::http::request::ProxyRequest;
use crate::http::response::ProxyResponse;
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Default cap on request bodies buffered in memory (2MB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Result of offering a request to the route table.
#[derive(Debug)]
pub enum Dispatch {
    /// A route matched and the backend answered.
    Proxied(ProxyResponse),
    /// No route matched; the request is returned untouched.
    Unmatched(ProxyRequest),
}

/// Route, resolve, and forward one request.
pub async fn dispatch(
    table: &RouteTable,
    request: ProxyRequest,
    body_limit: usize,
) -> Result<Dispatch, ProxyError> {
    let start = Instant::now();
    let path = request.full_path().to_string();

    let Some(matched) = table.resolve(&path, &request)? else {
        return Ok(Dispatch::Unmatched(request));
    };
    let route = matched.route;
    forwarder::ensure_supported(request.method())?;
    let uri = route.target().resolve(&path, &matched.captures, &request)?;

    tracing::debug!(
        path = %path,
        route = %route.pattern(),
        uri = %uri,
        "Route matched"
    );

    let mut request = if needs_buffering(&request) {
        request.into_seekable(body_limit).await?
    } else {
        request
    };
    let method = request.method().clone();

    let options = route.options();
    let response = cache::maybe_cached_forward(
        options,
        &method,
        &path,
        forwarder::forward(route.client(), &mut request, uri, options),
    )
    .await?;

    metrics::record_request(method.as_str(), response.status, route.pattern().as_str(), start);
    Ok(Dispatch::Proxied(response))
}

fn needs_buffering(request: &ProxyRequest) -> bool {
    let method = request.method();
    (*method == Method::PUT || *method == Method::POST) && request.body().len().is_none()
}

/// Layer that puts a [`ReverseProxy`] in front of a service.
#[derive(Debug, Clone)]
pub struct ReverseProxyLayer {
    table: Arc<RouteTable>,
    body_limit: usize,
}

impl ReverseProxyLayer {
    pub fn new(table: RouteTable) -> Self {
        Self::from_shared(Arc::new(table))
    }

    pub fn from_shared(table: Arc<RouteTable>) -> Self {
        Self {
            table,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Cap for request bodies that must be buffered before forwarding.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}

impl<S> Layer<S> for ReverseProxyLayer {
    type Service = ReverseProxy<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ReverseProxy {
            table: self.table.clone(),
            inner,
            body_limit: self.body_limit,
        }
    }
}

/// Proxies matching requests; hands everything else to `inner`.
#[derive(Debug, Clone)]
pub struct ReverseProxy<S> {
    table: Arc<RouteTable>,
    inner: S,
    body_limit: usize,
}

impl<S> ReverseProxy<S> {
    pub fn new(table: Arc<RouteTable>, inner: S) -> Self {
        Self {
            table,
            inner,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

impl<S> ReverseProxy<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    /// Handle one request: proxy it, or delegate it to the fallback.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        handle(self.table.clone(), self.inner.clone(), self.body_limit, request).await
    }
}

async fn handle<S>(
    table: Arc<RouteTable>,
    mut inner: S,
    body_limit: usize,
    request: Request<Body>,
) -> Result<Response, ProxyError>
where
    S: Service<Request<Body>, Response = Response> + Send,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    match dispatch(&table, ProxyRequest::from_http(request), body_limit).await? {
        Dispatch::Proxied(response) => Ok(response.into_response()),
        Dispatch::Unmatched(request) => {
            metrics::record_fallback();
            std::future::poll_fn(|cx| inner.poll_ready(cx))
                .await
                .map_err(|e| ProxyError::Fallback(e.into()))?;
            inner
                .call(request.into_http())
                .await
                .map_err(|e| ProxyError::Fallback(e.into()))
        }
    }
}

impl<S> Service<Request<Body>> for ReverseProxy<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = ProxyError;
    type Future = BoxFuture<'static, Result<Response, ProxyError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The fallback is polled for readiness only when a request reaches it.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        Box::pin(handle(
            self.table.clone(),
            self.inner.clone(),
            self.body_limit,
            request,
        ))
    }
}
