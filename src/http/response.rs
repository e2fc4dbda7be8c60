//! Response handling and transformation.
//!
//! # Responsibilities
//! - Normalize backend responses into a `{status, headers, body}` triple
//! - Join multi-valued headers into one newline-separated value
//! - Drop headers owned by the outer envelope (`status`, `transfer-encoding`)
//! - Render the triple back into a host response
//!
//! # Design Decisions
//! - Backend bodies are fully buffered before they are returned
//! - Header names are lowercase; ordering is deterministic

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

/// Headers removed during normalization.
pub const STRIPPED_HEADERS: [&str; 2] = ["status", "transfer-encoding"];

/// A normalized backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Build a normalized response from raw backend parts.
    pub fn from_upstream(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            status: status.as_u16(),
            headers: normalize_headers(headers),
            body,
        }
    }

    /// Header value by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY)
    }
}

/// Collapse a header map into one string per name.
pub fn normalize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    for name in headers.keys() {
        if STRIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        normalized.insert(name.as_str().to_string(), joined);
    }
    normalized
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                tracing::debug!(header = %name, "Dropping invalid header name");
                continue;
            };
            for part in value.split('\n') {
                match HeaderValue::from_str(part) {
                    Ok(v) => {
                        headers.append(name.clone(), v);
                    }
                    Err(_) => tracing::debug!(header = %name, "Dropping invalid header value"),
                }
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_joins_and_strips() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("status", HeaderValue::from_static("200"));
        headers.insert("Content-Type", HeaderValue::from_static("text/plain"));

        let response = ProxyResponse::from_upstream(StatusCode::OK, &headers, Bytes::from_static(b"ok"));

        assert_eq!(response.header("set-cookie"), Some("a=1\nb=2"));
        assert_eq!(response.header("Content-Type"), Some("text/plain"));
        assert!(!response.headers.contains_key("transfer-encoding"));
        assert!(!response.headers.contains_key("status"));
    }

    #[test]
    fn test_into_response_splits_joined_values() {
        let mut headers = BTreeMap::new();
        headers.insert("set-cookie".to_string(), "a=1\nb=2".to_string());
        headers.insert("x-custom".to_string(), "yes".to_string());

        let response = ProxyResponse::new(201, headers, "created").into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let cookies: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(response.headers()["x-custom"], "yes");
    }
}
