//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Host request
//!     → request.rs (ProxyRequest: parts + seekable/streaming body)
//!     → [routing layer decides target]
//!     → forwarder.rs (outbound headers, body, credentials, TLS, timeouts)
//!     → response.rs (normalize backend response)
//!     → server.rs (render for the client)
//! ```

pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ProxyBody, ProxyRequest};
pub use response::ProxyResponse;
pub use server::HttpServer;
