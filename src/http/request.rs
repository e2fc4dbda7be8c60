//! Inbound request representation.
//!
//! # Responsibilities
//! - Wrap the host's request parts without altering them
//! - Track whether the body is seekable (buffered) or a one-shot stream
//! - Expose routing-relevant information (path, full path, authority)
//! - Convert back into the host's request type for the fallback handler

use std::fmt;

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request, Uri};
use bytes::Bytes;

use crate::error::ProxyError;

/// Request body as seen by the forwarder.
pub enum ProxyBody {
    /// Fully buffered; can be read any number of times.
    Buffered(Bytes),
    /// A one-shot stream with an optional declared length.
    Streaming { body: Body, length: Option<u64> },
}

impl ProxyBody {
    pub fn empty() -> Self {
        ProxyBody::Buffered(Bytes::new())
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self, ProxyBody::Buffered(_))
    }

    /// Body length, when known.
    pub fn len(&self) -> Option<u64> {
        match self {
            ProxyBody::Buffered(bytes) => Some(bytes.len() as u64),
            ProxyBody::Streaming { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Convert into the host's body type.
    pub fn into_body(self) -> Body {
        match self {
            ProxyBody::Buffered(bytes) => Body::from(bytes),
            ProxyBody::Streaming { body, .. } => body,
        }
    }

    /// Body to send upstream plus its length.
    ///
    /// Buffered bodies stay in place so later layers can read them again;
    /// streams are taken and leave an empty body behind.
    pub(crate) fn take_outbound(&mut self) -> Result<(reqwest::Body, u64), ProxyError> {
        match std::mem::replace(self, ProxyBody::empty()) {
            ProxyBody::Buffered(bytes) => {
                let outbound = (reqwest::Body::from(bytes.clone()), bytes.len() as u64);
                *self = ProxyBody::Buffered(bytes);
                Ok(outbound)
            }
            ProxyBody::Streaming { body, length: None } => {
                *self = ProxyBody::Streaming { body, length: None };
                Err(ProxyError::MissingContentLength)
            }
            ProxyBody::Streaming { body, length: Some(length) } => {
                Ok((reqwest::Body::wrap_stream(body.into_data_stream()), length))
            }
        }
    }
}

impl fmt::Debug for ProxyBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyBody::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            ProxyBody::Streaming { length, .. } => {
                f.debug_struct("Streaming").field("length", length).finish_non_exhaustive()
            }
        }
    }
}

/// An inbound request being considered for proxying.
#[derive(Debug)]
pub struct ProxyRequest {
    parts: Parts,
    body: ProxyBody,
}

impl ProxyRequest {
    pub fn new(parts: Parts, body: ProxyBody) -> Self {
        Self { parts, body }
    }

    /// Wrap a host request, keeping its body as a stream.
    ///
    /// The declared length comes from the `Content-Length` header.
    pub fn from_http(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        let length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        Self {
            parts,
            body: ProxyBody::Streaming { body, length },
        }
    }

    /// Wrap a host request, reading the body into memory (up to `limit` bytes).
    pub async fn buffered(request: Request<Body>, limit: usize) -> Result<Self, ProxyError> {
        Self::from_http(request).into_seekable(limit).await
    }

    /// Buffer a streaming body so it becomes seekable.
    pub async fn into_seekable(self, limit: usize) -> Result<Self, ProxyError> {
        match self.body {
            ProxyBody::Buffered(_) => Ok(self),
            ProxyBody::Streaming { body, .. } => {
                let bytes = axum::body::to_bytes(body, limit)
                    .await
                    .map_err(ProxyError::Body)?;
                Ok(Self {
                    parts: self.parts,
                    body: ProxyBody::Buffered(bytes),
                })
            }
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Path without the query string.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Path including the query string.
    pub fn full_path(&self) -> &str {
        self.parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &ProxyBody {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut ProxyBody {
        &mut self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Authority the client addressed: the `Host` header, else the URI authority.
    pub fn authority(&self) -> Option<String> {
        self.parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| self.parts.uri.authority().map(|a| a.to_string()))
    }

    /// Convert back into the host's request type.
    pub fn into_http(self) -> Request<Body> {
        Request::from_parts(self.parts, self.body.into_body())
    }

    pub fn into_parts(self) -> (Parts, ProxyBody) {
        (self.parts, self.body)
    }
}
