//! Rendering service client subsystem.
//!
//! # Data Flow
//! ```text
//! RenderRequest
//!     → url.rs (service URL + original URL without _escaped_fragment_)
//!     → options.rs (generated options, caller options merged on top)
//!     → transport.rs (GET, no redirects, full body)
//!     → decode.rs (gunzip, drop content-encoding/content-length)
//!     → UpstreamResponse | None
//! ```
//!
//! # Design Decisions
//! - Bodies are accumulated before delivery; filters and retry policies
//!   need the complete text
//! - Transport and decoding failures never reach the caller

pub mod decode;
pub mod fetcher;
pub mod options;
pub mod transport;
pub mod url;

use axum::http::{HeaderMap, StatusCode};
use std::time::Duration;

pub use fetcher::Fetcher;
pub use transport::{RawResponse, ReqwestTransport, Transport};
pub use self::url::UrlBuilder;

/// A GET request to the rendering service.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub follow_redirect: bool,
    pub timeout: Option<Duration>,
}

/// A decoded response from the rendering service.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}
