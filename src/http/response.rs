//! Response emission.
//!
//! # Responsibilities
//! - Turn a rendered page or a cached render into a client response
//! - Strip hop-by-hop headers from relayed responses
//! - Map hook failures to the host's generic error response
//!
//! # Design Decisions
//! - The body is framed by the host server; upstream framing headers
//!   (`transfer-encoding`, `connection`, ...) are never forwarded, and
//!   `content-length` is recomputed from the relayed body
//! - Text bodies without a content type are sent as HTML

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::PrerenderError;
use crate::hooks::CachedRender;
use crate::upstream::UpstreamResponse;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const HTML: HeaderValue = HeaderValue::from_static("text/html; charset=utf-8");

/// Remove headers that only apply to a single connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

fn text_response(status: StatusCode, mut headers: HeaderMap, body: String) -> Response {
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HTML);
    }
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Relay a page from the rendering service: status, headers, body.
pub fn relay_response(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse {
        status,
        mut headers,
        body,
    } = upstream;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);
    text_response(status, headers, body)
}

/// Serve a render returned by the before-render hook.
pub fn cached_response(cached: CachedRender) -> Response {
    let status = cached.status();
    text_response(status, HeaderMap::new(), cached.into_body())
}

impl IntoResponse for PrerenderError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Prerender middleware failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
