//! HTTP client capability used to reach the rendering service.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use reqwest::redirect::Policy;

use crate::error::FetchError;
use crate::upstream::UpstreamRequest;

/// Redirect hops followed when a request opts into `follow_redirect`.
pub const MAX_REDIRECTS: usize = 10;

/// A fully received response, before any decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Issues a GET and returns status, headers and the complete body.
///
/// Implementations own connection pooling, TLS and DNS.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &UpstreamRequest) -> Result<RawResponse, FetchError>;
}

/// `reqwest`-backed transport.
///
/// Automatic decompression stays off: gzip is handled by the fetcher so
/// headers and body can be adjusted together. System proxy variables are
/// ignored; the rendering service is dialed directly.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    direct: reqwest::Client,
    following: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, FetchError> {
        let direct = reqwest::Client::builder()
            .redirect(Policy::none())
            .no_proxy()
            .build()?;
        let following = reqwest::Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .no_proxy()
            .build()?;
        Ok(Self { direct, following })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &UpstreamRequest) -> Result<RawResponse, FetchError> {
        let client = if request.follow_redirect {
            &self.following
        } else {
            &self.direct
        };

        let response = client
            .get(&request.url)
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
