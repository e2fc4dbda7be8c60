//! Outbound request construction and execution.
//!
//! # Responsibilities
//! - Reject methods that cannot be forwarded, before any network activity
//! - Copy inbound headers, rewrite `Host`, add `X-Forwarded-Host`
//! - Attach request bodies for PUT/POST with an explicit content length
//! - Apply credentials, TLS verification, connect and read timeouts
//! - Buffer the complete backend response and normalize it
//!
//! # Design Decisions
//! - One `reqwest::Client` per route, built at registration from resolved options
//! - Redirects are returned to the caller, never followed
//! - Transport errors propagate untouched; no retries

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::Method;
use bytes::BytesMut;
use futures_util::StreamExt;
use url::Url;

use crate::config::options::ResolvedOptions;
use crate::error::ProxyError;
use crate::http::request::ProxyRequest;
use crate::http::response::ProxyResponse;

/// Methods the forwarder accepts.
pub const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::PUT,
    Method::POST,
];

/// Connection-scoped and framing headers owned by the transport.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Fail with `UnsupportedMethod` unless `method` can be forwarded.
pub fn ensure_supported(method: &Method) -> Result<(), ProxyError> {
    if SUPPORTED_METHODS.contains(method) {
        Ok(())
    } else {
        Err(ProxyError::UnsupportedMethod(method.clone()))
    }
}

fn carries_body(method: &Method) -> bool {
    *method == Method::PUT || *method == Method::POST
}

/// Build the upstream client for a route.
pub fn build_client(options: &ResolvedOptions) -> Result<reqwest::Client, ProxyError> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .danger_accept_invalid_certs(!options.verify_ssl);

    if let Some(open_timeout) = options.open_timeout {
        builder = builder.connect_timeout(open_timeout);
    }
    if let Some(timeout) = options.timeout {
        builder = builder.read_timeout(timeout);
    }

    builder.build().map_err(ProxyError::Client)
}

/// `host[:port]` of the target, port omitted when it is the scheme default.
pub fn target_authority(uri: &Url) -> Option<String> {
    let host = uri.host_str()?;
    Some(match uri.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Headers for the outbound request.
pub fn outbound_headers(request: &ProxyRequest, uri: &Url, options: &ResolvedOptions) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in request.headers() {
        if value.is_empty() || HOP_BY_HOP.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if options.preserve_host {
        if let Some(value) = target_authority(uri).and_then(|a| HeaderValue::from_str(&a).ok()) {
            headers.insert(header::HOST, value);
        }
    }

    if options.x_forwarded_host {
        if let Some(value) = request
            .authority()
            .and_then(|a| HeaderValue::from_str(&a).ok())
        {
            headers.insert(X_FORWARDED_HOST, value);
        }
    }

    if options.credentials.is_some() {
        headers.remove(header::AUTHORIZATION);
    }

    headers
}

/// Forward `request` to `uri` and return the normalized response.
pub async fn forward(
    client: &reqwest::Client,
    request: &mut ProxyRequest,
    uri: Url,
    options: &ResolvedOptions,
) -> Result<ProxyResponse, ProxyError> {
    let method = request.method().clone();
    ensure_supported(&method)?;

    let mut headers = outbound_headers(request, &uri, options);

    let body = if carries_body(&method) {
        let (body, length) = request.body_mut().take_outbound()?;
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        if let Some(content_type) = request
            .content_type()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        Some(body)
    } else {
        None
    };

    tracing::debug!(
        method = %method,
        uri = %uri,
        has_body = body.is_some(),
        "Forwarding request"
    );

    let mut builder = client.request(method, uri.clone()).headers(headers);
    if let Some(credentials) = &options.credentials {
        builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
    }
    if let Some(body) = body {
        builder = builder.body(body);
    }

    let transport_error = |source: reqwest::Error| {
        tracing::warn!(uri = %uri, error = %source, "Upstream error");
        ProxyError::Transport {
            uri: uri.to_string(),
            source,
        }
    };

    let response = builder.send().await.map_err(transport_error)?;
    let status = response.status();
    let response_headers = response.headers().clone();

    let mut buffer = BytesMut::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        buffer.extend_from_slice(&chunk.map_err(transport_error)?);
    }

    Ok(ProxyResponse::from_upstream(
        status,
        &response_headers,
        buffer.freeze(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::{GlobalOptions, RouteOptions};
    use axum::body::Body;
    use axum::http::Request;

    fn request_with(headers: &[(&str, &str)]) -> ProxyRequest {
        let mut builder = Request::builder().uri("/api/items");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        ProxyRequest::from_http(builder.body(Body::empty()).unwrap())
    }

    fn options(route: RouteOptions) -> ResolvedOptions {
        route.resolve(&GlobalOptions::default())
    }

    #[test]
    fn test_supported_methods() {
        for method in SUPPORTED_METHODS.iter() {
            assert!(ensure_supported(method).is_ok());
        }
        assert!(matches!(
            ensure_supported(&Method::PATCH),
            Err(ProxyError::UnsupportedMethod(m)) if m == Method::PATCH
        ));
        assert!(ensure_supported(&Method::CONNECT).is_err());
    }

    #[test]
    fn test_headers_rewritten() {
        let req = request_with(&[
            ("host", "proxy.local"),
            ("accept", "text/html"),
            ("x-empty", ""),
            ("connection", "keep-alive"),
            ("content-length", "0"),
        ]);
        let uri = Url::parse("http://backend.internal:8080/items").unwrap();

        let headers = outbound_headers(&req, &uri, &options(RouteOptions::new()));
        assert_eq!(headers["host"], "backend.internal:8080");
        assert_eq!(headers["x-forwarded-host"], "proxy.local");
        assert_eq!(headers["accept"], "text/html");
        assert!(!headers.contains_key("x-empty"));
        assert!(!headers.contains_key("connection"));
        assert!(!headers.contains_key("content-length"));
    }

    #[test]
    fn test_headers_without_rewrites() {
        let req = request_with(&[("host", "proxy.local")]);
        let uri = Url::parse("https://backend.internal/items").unwrap();

        let headers = outbound_headers(
            &req,
            &uri,
            &options(RouteOptions {
                preserve_host: Some(false),
                x_forwarded_host: Some(false),
                ..Default::default()
            }),
        );
        assert_eq!(headers["host"], "proxy.local");
        assert!(!headers.contains_key("x-forwarded-host"));
    }

    #[test]
    fn test_default_port_omitted_from_host() {
        let uri = Url::parse("https://backend.internal:443/x").unwrap();
        assert_eq!(target_authority(&uri).as_deref(), Some("backend.internal"));
    }

    #[test]
    fn test_inbound_authorization_replaced_by_credentials() {
        let req = request_with(&[("authorization", "Bearer client-token")]);
        let uri = Url::parse("http://backend/").unwrap();

        let headers = outbound_headers(&req, &uri, &options(RouteOptions::new().basic_auth("u", "p")));
        assert!(!headers.contains_key("authorization"));

        let headers = outbound_headers(&req, &uri, &options(RouteOptions::new()));
        assert_eq!(headers["authorization"], "Bearer client-token");
    }

    #[tokio::test]
    async fn test_patch_rejected_before_network() {
        let mut req = ProxyRequest::from_http(
            Request::builder()
                .method(Method::PATCH)
                .uri("/x")
                .body(Body::empty())
                .unwrap(),
        );
        let opts = options(RouteOptions::new());
        let client = build_client(&opts).unwrap();
        // nothing listens on port 9; a network attempt would surface as Transport
        let uri = Url::parse("http://127.0.0.1:9/x").unwrap();

        let err = forward(&client, &mut req, uri, &opts).await.unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedMethod(_)));
    }
}
