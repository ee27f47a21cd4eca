//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) or propagate the caller's
//! - Snapshot the metadata the prerender pipeline reads (method, URL,
//!   headers, protocol) so it stays immutable for one invocation
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Header values that are not visible ASCII are treated as absent

use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Request, Uri,
};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates a fresh UUID v4 for requests without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer assigning `x-request-id` to incoming requests.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying `x-request-id` onto responses.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read the request ID from a header map, for log fields.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Immutable view of an incoming request, as seen by the classifier,
/// the URL builder and the hooks.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    protocol: String,
}

impl RenderRequest {
    /// Snapshot a request. The protocol is taken from the URI scheme and
    /// defaults to `http`.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(
            request.method().clone(),
            request.uri().clone(),
            request.headers().clone(),
        )
    }

    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let protocol = uri.scheme_str().unwrap_or("http").to_string();
        Self {
            method,
            uri,
            headers,
            protocol,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Raw request URL: path plus query string.
    pub fn url(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Header value as a string; non-empty values only.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT)
    }

    pub fn referer(&self) -> Option<&str> {
        self.header(header::REFERER)
    }

    /// Host header, falling back to the URI authority (HTTP/2).
    pub fn host(&self) -> Option<&str> {
        self.header(header::HOST)
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
    }

    pub fn request_id(&self) -> &str {
        request_id(&self.headers)
    }
}
