//! Fetches a rendered page from the rendering service.
//!
//! # Responsibilities
//! - Build the request (URL, forwarded user agent, gzip, token)
//! - Merge caller-supplied request options on top
//! - Enforce the optional deadline
//! - Decode the body and report transport failures as "no response"

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::error::FetchError;
use crate::http::request::RenderRequest;
use crate::observability::metrics;
use crate::upstream::decode::decode_body;
use crate::upstream::options::deep_merge;
use crate::upstream::transport::Transport;
use crate::upstream::url::UrlBuilder;
use crate::upstream::{UpstreamRequest, UpstreamResponse};

/// Environment variable supplying the service token.
pub const TOKEN_ENV: &str = "PRERENDER_TOKEN";

/// Header carrying the service token.
pub const X_PRERENDER_TOKEN: &str = "X-Prerender-Token";

/// Resolve the token: explicit value, then environment.
pub fn resolve_token(configured: Option<&str>) -> Option<String> {
    resolve_token_from(configured, std::env::var(TOKEN_ENV).ok())
}

/// Same as [`resolve_token`] with the environment value passed in.
pub fn resolve_token_from(configured: Option<&str>, env: Option<String>) -> Option<String> {
    configured
        .map(str::to_string)
        .or(env)
        .filter(|token| !token.is_empty())
}

pub struct Fetcher {
    urls: UrlBuilder,
    token: Option<String>,
    request_options: Option<Value>,
    timeout_ms: Option<u64>,
    transport: Arc<dyn Transport>,
}

impl Fetcher {
    pub fn new(urls: UrlBuilder, transport: Arc<dyn Transport>) -> Self {
        Self {
            urls,
            token: None,
            request_options: None,
            timeout_ms: None,
            transport,
        }
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Options merged over the generated ones on every fetch.
    pub fn request_options(mut self, options: Option<Value>) -> Self {
        self.request_options = options;
        self
    }

    /// Default deadline; a `timeout_ms` request option overrides it.
    pub fn timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn url_builder(&self) -> &UrlBuilder {
        &self.urls
    }

    /// The option tree for one fetch, after merging.
    pub fn options(&self, request: &RenderRequest) -> Value {
        let mut options = json!({
            "uri": self.urls.build(request),
            "follow_redirect": false,
            "headers": {
                "Accept-Encoding": "gzip",
            },
        });
        if let Some(user_agent) = request.user_agent() {
            options["headers"]["User-Agent"] = json!(user_agent);
        }
        if let Some(token) = &self.token {
            options["headers"][X_PRERENDER_TOKEN] = json!(token);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            options["timeout_ms"] = json!(timeout_ms);
        }
        if let Some(overrides) = &self.request_options {
            deep_merge(&mut options, overrides);
        }
        options
    }

    pub fn upstream_request(&self, request: &RenderRequest) -> Result<UpstreamRequest, FetchError> {
        UpstreamRequest::from_options(&self.options(request))
    }

    /// Fetch and decode, surfacing every failure.
    pub async fn try_fetch(&self, request: &RenderRequest) -> Result<UpstreamResponse, FetchError> {
        let upstream = self.upstream_request(request)?;

        tracing::debug!(
            request_id = %request.request_id(),
            url = %upstream.url,
            "Fetching prerendered page"
        );

        let raw = match upstream.timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.transport.get(&upstream))
                .await
                .map_err(|_| FetchError::Timeout(deadline))??,
            None => self.transport.get(&upstream).await?,
        };

        let mut headers = raw.headers;
        let body = decode_body(&mut headers, &raw.body)?;

        Ok(UpstreamResponse {
            status: raw.status,
            headers,
            body,
        })
    }

    /// Fetch a prerendered page; `None` on any transport or decoding failure.
    pub async fn fetch(&self, request: &RenderRequest) -> Option<UpstreamResponse> {
        let start = Instant::now();
        match self.try_fetch(request).await {
            Ok(response) => {
                tracing::debug!(
                    request_id = %request.request_id(),
                    status = %response.status,
                    "Prerendered page received"
                );
                metrics::record_fetch("ok", start);
                Some(response)
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request.request_id(),
                    url = %request.url(),
                    error = %e,
                    "Rendering service unreachable"
                );
                metrics::record_fetch("error", start);
                None
            }
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("urls", &self.urls)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("request_options", &self.request_options)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
