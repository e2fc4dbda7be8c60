//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the route table from configuration
//! - Put the reverse proxy in front of a fallback router
//! - Render proxy errors as JSON responses
//! - Wire up middleware (tracing, request ID)
//! - Serve on a listener until shutdown

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{build_route_table, ConfigError, ProxyConfig};
use crate::error::ProxyError;
use crate::lifecycle::shutdown;
use crate::proxy::ReverseProxyLayer;
use crate::routing::RouteTable;

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let table = build_route_table(&config)?;
        let router = Self::build_router(&config, table);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, table: RouteTable) -> Router {
        let fallback = Router::new().fallback(not_found);

        let proxy = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(render_error))
            .layer(ReverseProxyLayer::new(table).body_limit(config.listener.max_body_size))
            .service(fallback);

        Router::new()
            .fallback_service(proxy)
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Router serving the proxy, for embedding or testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Render a proxy error as a JSON response.
async fn render_error(err: ProxyError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = %err, status = %status, "Proxy request failed");
    } else {
        tracing::warn!(error = %err, status = %status, "Proxy request rejected");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn not_found(request: Request<Body>) -> impl IntoResponse {
    tracing::debug!(path = %request.uri().path(), "No route matched");
    (StatusCode::NOT_FOUND, "No matching route found")
}
