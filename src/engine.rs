//! The prerender decision engine.
//!
//! ```text
//! RenderRequest
//!     → Classifier ── false ──▶ Declined (next handler)
//!     → before-render hook ── cached ──▶ Cached
//!     → RetryController { Fetcher } ──▶ Rendered | PassThrough
//! ```

use std::sync::Arc;

use crate::classify::{Classifier, PatternList, PatternSpec};
use crate::config::validation::validate_prerender;
use crate::config::{ConfigError, PrerenderConfig};
use crate::error::PrerenderError;
use crate::hooks::{CachedRender, Hooks};
use crate::http::request::RenderRequest;
use crate::resilience::{Disposition, RetryController};
use crate::upstream::fetcher::resolve_token;
use crate::upstream::url::resolve_service_url;
use crate::upstream::{Fetcher, ReqwestTransport, Transport, UpstreamResponse, UrlBuilder};

/// What the middleware should do with a request.
#[derive(Debug)]
pub enum Outcome {
    /// Not a prerender request.
    Declined,
    /// Served from the before-render hook.
    Cached(CachedRender),
    /// Relay this response from the rendering service.
    Rendered(UpstreamResponse),
    /// The rendering service gave nothing usable.
    PassThrough,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Declined => "declined",
            Outcome::Cached(_) => "cached",
            Outcome::Rendered(_) => "rendered",
            Outcome::PassThrough => "pass_through",
        }
    }
}

/// Immutable prerender engine, shared by all requests.
#[derive(Debug)]
pub struct Prerender {
    classifier: Classifier,
    fetcher: Fetcher,
    hooks: Hooks,
    retry_limit: u32,
}

impl Prerender {
    pub fn builder() -> PrerenderBuilder {
        PrerenderBuilder::default()
    }

    pub fn should_prerender(&self, request: &RenderRequest) -> bool {
        self.classifier.should_prerender(request)
    }

    /// URL the rendering service is asked for.
    pub fn build_api_url(&self, request: &RenderRequest) -> String {
        self.fetcher.url_builder().build(request)
    }

    pub fn service_url(&self) -> &str {
        self.fetcher.url_builder().service_url()
    }

    /// One fetch attempt; `None` on transport failure.
    pub async fn fetch(&self, request: &RenderRequest) -> Option<UpstreamResponse> {
        self.fetcher.fetch(request).await
    }

    /// Classify, then render.
    pub async fn handle(&self, request: &RenderRequest) -> Result<Outcome, PrerenderError> {
        if !self.should_prerender(request) {
            return Ok(Outcome::Declined);
        }
        self.render(request).await
    }

    /// Cache lookup, then fetch with retries. Does not classify.
    pub async fn render(&self, request: &RenderRequest) -> Result<Outcome, PrerenderError> {
        if let Some(cached) = self.hooks.run_before_render(request).await? {
            tracing::debug!(
                request_id = %request.request_id(),
                status = %cached.status(),
                "Serving cached render"
            );
            return Ok(Outcome::Cached(cached));
        }

        let controller = RetryController::new(&self.hooks, self.retry_limit);
        let disposition = controller
            .run(request, || self.fetcher.fetch(request))
            .await?;

        Ok(match disposition {
            Disposition::Relay { response, attempts } => {
                tracing::info!(
                    request_id = %request.request_id(),
                    url = %request.url(),
                    status = %response.status,
                    attempts,
                    "Relaying prerendered page"
                );
                Outcome::Rendered(response)
            }
            Disposition::PassThrough { .. } => Outcome::PassThrough,
        })
    }
}

/// Builds a `Prerender` from configuration, hooks and a transport.
#[derive(Default)]
pub struct PrerenderBuilder {
    config: PrerenderConfig,
    hooks: Hooks,
    transport: Option<Arc<dyn Transport>>,
}

impl PrerenderBuilder {
    pub fn config(mut self, config: PrerenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Prerender, ConfigError> {
        let PrerenderBuilder {
            config,
            hooks,
            transport,
        } = self;

        validate_prerender(&config).map_err(ConfigError::Validation)?;

        let compile = |spec: Option<&PatternSpec>| -> Result<Option<PatternList>, ConfigError> {
            Ok(spec.map(PatternList::compile).transpose()?)
        };
        let classifier = Classifier::new(
            compile(config.allowlist.as_ref())?,
            compile(config.denylist.as_ref())?,
        );

        let transport: Arc<dyn Transport> = match transport {
            Some(t) => t,
            None => Arc::new(
                ReqwestTransport::new().map_err(|e| ConfigError::Transport(e.to_string()))?,
            ),
        };

        let urls = UrlBuilder::new(resolve_service_url(config.service_url.as_deref()))
            .protocol(config.protocol.clone())
            .host(config.host.clone());
        let fetcher = Fetcher::new(urls, transport)
            .token(resolve_token(config.token.as_deref()))
            .request_options(config.request_options.clone())
            .timeout_ms(config.timeout_ms);

        tracing::info!(
            service_url = %fetcher.url_builder().service_url(),
            retry_limit = config.retry_limit,
            hooks = ?hooks,
            "Prerender engine ready"
        );

        Ok(Prerender {
            classifier,
            fetcher,
            hooks,
            retry_limit: config.retry_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;
    use crate::error::FetchError;
    use crate::upstream::{RawResponse, UpstreamRequest};
    use async_trait::async_trait;
    use axum::http::{HeaderMap, Request, StatusCode};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: AtomicU32,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn get(&self, request: &UpstreamRequest) -> Result<RawResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(request.url.clone());
            Ok(RawResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::from_static(b"<html>rendered</html>"),
            })
        }
    }

    fn engine(transport: Arc<Recording>, hooks: Hooks) -> Prerender {
        Prerender::builder()
            .config(PrerenderConfig {
                service_url: Some("http://service.prerender.io/".into()),
                ..Default::default()
            })
            .hooks(hooks)
            .transport(transport)
            .build()
            .unwrap()
    }

    fn request(uri: &str, user_agent: &str) -> RenderRequest {
        RenderRequest::from_request(
            &Request::get(uri)
                .header("host", "example.com")
                .header("user-agent", user_agent)
                .body(())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_declined_makes_no_fetch() {
        let transport = Arc::new(Recording::default());
        let engine = engine(transport.clone(), Hooks::new());

        let outcome = engine.handle(&request("/page", "Mozilla/5.0")).await.unwrap();
        assert!(matches!(outcome, Outcome::Declined));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_escaped_fragment_rendered() {
        let transport = Arc::new(Recording::default());
        let engine = engine(transport.clone(), Hooks::new());

        let outcome = engine
            .handle(&request("/page?foo=bar&_escaped_fragment_=", "Mozilla/5.0"))
            .await
            .unwrap();

        let Outcome::Rendered(response) = outcome else {
            panic!("expected rendered outcome");
        };
        assert_eq!(response.body, "<html>rendered</html>");
        assert_eq!(
            transport.urls.lock().unwrap().as_slice(),
            ["http://service.prerender.io/http://example.com/page?foo=bar"]
        );
    }

    #[tokio::test]
    async fn test_cached_render_skips_fetch() {
        let transport = Arc::new(Recording::default());
        let hooks = Hooks::new().before_render_fn(|_req| async {
            Some(CachedRender::Structured {
                status: Some(StatusCode::NOT_FOUND),
                body: Some("gone".into()),
            })
        });
        let engine = engine(transport.clone(), hooks);

        let outcome = engine.handle(&request("/", "Twitterbot")).await.unwrap();
        let Outcome::Cached(cached) = outcome else {
            panic!("expected cached outcome");
        };
        assert_eq!(cached.status(), StatusCode::NOT_FOUND);
        assert_eq!(cached.into_body(), "gone");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Prerender::builder()
            .config(PrerenderConfig {
                allowlist: Some(PatternSpec::from("(")),
                ..Default::default()
            })
            .transport(Arc::new(Recording::default()))
            .build();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unusable_request_options_rejected() {
        let transport = Arc::new(Recording::default());
        let result = Prerender::builder()
            .config(PrerenderConfig {
                request_options: Some(serde_json::json!({
                    "headers": { "X-Bad": { "nested": 1 } }
                })),
                ..Default::default()
            })
            .transport(transport.clone())
            .build();

        let Err(ConfigError::Validation(errors)) = result else {
            panic!("expected validation failure");
        };
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidRequestOptions { .. }]
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
