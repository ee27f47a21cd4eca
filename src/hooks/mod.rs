//! Injectable extension points.
//!
//! # Hooks
//! - `BeforeRender`: cache lookup, may short-circuit with a stored render
//! - `RetryPolicy`: decides whether a fetch attempt should be repeated
//! - `AfterRender`: observes the final upstream response
//! - `BodyFilter`: rewrites the body before it is relayed
//!
//! Every hook is optional. An absent hook behaves as a no-op: no cached
//! render, never retry, nothing observed, body unchanged.
//!
//! Closures can be registered directly through the `*_fn` builder methods;
//! types that can fail implement the traits and return `HookError`.

use async_trait::async_trait;
use axum::http::StatusCode;
use std::future::Future;
use std::sync::Arc;

use crate::error::{HookError, PrerenderError};
use crate::http::request::RenderRequest;
use crate::upstream::UpstreamResponse;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedRender {
    /// A bare body, served with status 200.
    Body(String),
    /// Explicit status and body; missing fields default to 200 and "".
    Structured {
        status: Option<StatusCode>,
        body: Option<String>,
    },
}

impl CachedRender {
    /// Status code the cached render is served with.
    pub fn status(&self) -> StatusCode {
        match self {
            CachedRender::Body(_) => StatusCode::OK,
            CachedRender::Structured { status, .. } => status.unwrap_or(StatusCode::OK),
        }
    }

    /// Consume the render and return its body.
    pub fn into_body(self) -> String {
        match self {
            CachedRender::Body(body) => body,
            CachedRender::Structured { body, .. } => body.unwrap_or_default(),
        }
    }
}

impl From<String> for CachedRender {
    fn from(body: String) -> Self {
        CachedRender::Body(body)
    }
}

impl From<&str> for CachedRender {
    fn from(body: &str) -> Self {
        CachedRender::Body(body.to_string())
    }
}

/// Cache lookup run before contacting the rendering service.
#[async_trait]
pub trait BeforeRender: Send + Sync {
    async fn before_render(
        &self,
        request: &RenderRequest,
    ) -> Result<Option<CachedRender>, HookError>;
}

/// Decides whether another fetch attempt should be made.
///
/// `response` is `None` when the previous attempt failed at the transport
/// level.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(
        &self,
        request: &RenderRequest,
        response: Option<&UpstreamResponse>,
    ) -> Result<bool, HookError>;
}

/// Observes the response about to be relayed.
pub trait AfterRender: Send + Sync {
    fn after_render(
        &self,
        request: &RenderRequest,
        response: &UpstreamResponse,
        attempts: u32,
    ) -> Result<(), HookError>;
}

/// Transforms the rendered body before it is relayed.
pub trait BodyFilter: Send + Sync {
    fn filter(&self, body: String) -> Result<String, HookError>;
}

struct FnBeforeRender<F>(F);

#[async_trait]
impl<F, Fut> BeforeRender for FnBeforeRender<F>
where
    F: Fn(&RenderRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Option<CachedRender>> + Send,
{
    async fn before_render(
        &self,
        request: &RenderRequest,
    ) -> Result<Option<CachedRender>, HookError> {
        Ok((self.0)(request).await)
    }
}

struct FnRetryPolicy<F>(F);

impl<F> RetryPolicy for FnRetryPolicy<F>
where
    F: Fn(&RenderRequest, Option<&UpstreamResponse>) -> bool + Send + Sync,
{
    fn should_retry(
        &self,
        request: &RenderRequest,
        response: Option<&UpstreamResponse>,
    ) -> Result<bool, HookError> {
        Ok((self.0)(request, response))
    }
}

struct FnAfterRender<F>(F);

impl<F> AfterRender for FnAfterRender<F>
where
    F: Fn(&RenderRequest, &UpstreamResponse, u32) + Send + Sync,
{
    fn after_render(
        &self,
        request: &RenderRequest,
        response: &UpstreamResponse,
        attempts: u32,
    ) -> Result<(), HookError> {
        (self.0)(request, response, attempts);
        Ok(())
    }
}

struct FnBodyFilter<F>(F);

impl<F> BodyFilter for FnBodyFilter<F>
where
    F: Fn(String) -> String + Send + Sync,
{
    fn filter(&self, body: String) -> Result<String, HookError> {
        Ok((self.0)(body))
    }
}

/// The set of hooks a `Prerender` engine runs.
#[derive(Clone, Default)]
pub struct Hooks {
    before_render: Option<Arc<dyn BeforeRender>>,
    retry: Option<Arc<dyn RetryPolicy>>,
    after_render: Option<Arc<dyn AfterRender>>,
    body_filter: Option<Arc<dyn BodyFilter>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_render(mut self, hook: impl BeforeRender + 'static) -> Self {
        self.before_render = Some(Arc::new(hook));
        self
    }

    /// Register an async closure as the cache lookup.
    ///
    /// The returned future must not borrow the request; clone what it needs.
    pub fn before_render_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(&RenderRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<CachedRender>> + Send + 'static,
    {
        self.before_render(FnBeforeRender(f))
    }

    pub fn retry(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Some(Arc::new(policy));
        self
    }

    pub fn retry_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RenderRequest, Option<&UpstreamResponse>) -> bool + Send + Sync + 'static,
    {
        self.retry(FnRetryPolicy(f))
    }

    pub fn after_render(mut self, hook: impl AfterRender + 'static) -> Self {
        self.after_render = Some(Arc::new(hook));
        self
    }

    pub fn after_render_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RenderRequest, &UpstreamResponse, u32) + Send + Sync + 'static,
    {
        self.after_render(FnAfterRender(f))
    }

    pub fn body_filter(mut self, filter: impl BodyFilter + 'static) -> Self {
        self.body_filter = Some(Arc::new(filter));
        self
    }

    pub fn body_filter_fn<F>(self, f: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.body_filter(FnBodyFilter(f))
    }

    pub(crate) async fn run_before_render(
        &self,
        request: &RenderRequest,
    ) -> Result<Option<CachedRender>, PrerenderError> {
        match &self.before_render {
            Some(hook) => hook
                .before_render(request)
                .await
                .map_err(PrerenderError::hook("before_render")),
            None => Ok(None),
        }
    }

    pub(crate) fn run_retry(
        &self,
        request: &RenderRequest,
        response: Option<&UpstreamResponse>,
    ) -> Result<bool, PrerenderError> {
        match &self.retry {
            Some(policy) => policy
                .should_retry(request, response)
                .map_err(PrerenderError::hook("retry")),
            None => Ok(false),
        }
    }

    pub(crate) fn run_after_render(
        &self,
        request: &RenderRequest,
        response: &UpstreamResponse,
        attempts: u32,
    ) -> Result<(), PrerenderError> {
        match &self.after_render {
            Some(hook) => hook
                .after_render(request, response, attempts)
                .map_err(PrerenderError::hook("after_render")),
            None => Ok(()),
        }
    }

    pub(crate) fn run_body_filter(&self, body: String) -> Result<String, PrerenderError> {
        match &self.body_filter {
            Some(filter) => filter.filter(body).map_err(PrerenderError::hook("body_filter")),
            None => Ok(body),
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before_render", &self.before_render.is_some())
            .field("retry", &self.retry.is_some())
            .field("after_render", &self.after_render.is_some())
            .field("body_filter", &self.body_filter.is_some())
            .finish()
    }
}
