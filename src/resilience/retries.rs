//! Retry logic and final response handling.
//!
//! # States
//! - Fetching: one request to the rendering service
//! - Deciding: the retry policy sees the response (or its absence)
//! - Relaying: body filter, `content-length` dropped, after-render hook
//! - PassThrough: nothing to relay, the next handler takes over
//!
//! # State Transitions
//! ```text
//! Fetching → Deciding: fetch finished (response or None)
//! Deciding → Fetching: policy says retry and attempts < retry_limit
//! Deciding → Relaying: response present
//! Deciding → PassThrough: no response
//! ```
//!
//! # Design Decisions
//! - Attempts start at 1; a retry limit of 0 disables retries
//! - Fetches are strictly sequential, one in flight per request
//! - Relaying and PassThrough are terminal, so a response is emitted once

use axum::http::header;
use std::future::Future;

use crate::error::PrerenderError;
use crate::hooks::Hooks;
use crate::http::request::RenderRequest;
use crate::upstream::UpstreamResponse;

/// State of one prerender invocation.
#[derive(Debug)]
pub enum RenderState {
    Fetching,
    Deciding(Option<UpstreamResponse>),
    Relaying(UpstreamResponse),
    PassThrough,
}

/// Terminal result of the state machine.
#[derive(Debug)]
pub enum Disposition {
    /// Send this response to the caller.
    Relay {
        response: UpstreamResponse,
        attempts: u32,
    },
    /// Hand the request to the next handler.
    PassThrough { attempts: u32 },
}

/// True if another attempt is allowed after `attempts` fetches.
pub fn may_retry(retry_limit: u32, attempts: u32) -> bool {
    retry_limit > 0 && attempts < retry_limit
}

/// Drives fetch attempts and post-processes the final response.
pub struct RetryController<'a> {
    hooks: &'a Hooks,
    retry_limit: u32,
}

impl<'a> RetryController<'a> {
    pub fn new(hooks: &'a Hooks, retry_limit: u32) -> Self {
        Self { hooks, retry_limit }
    }

    /// Run the state machine; `fetch` performs one attempt.
    pub async fn run<F, Fut>(
        &self,
        request: &RenderRequest,
        mut fetch: F,
    ) -> Result<Disposition, PrerenderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<UpstreamResponse>>,
    {
        let mut attempts = 1;
        let mut state = RenderState::Fetching;

        loop {
            state = match state {
                RenderState::Fetching => RenderState::Deciding(fetch().await),
                RenderState::Deciding(response) => {
                    let wants_retry = self.hooks.run_retry(request, response.as_ref())?;
                    if wants_retry && may_retry(self.retry_limit, attempts) {
                        attempts += 1;
                        tracing::info!(
                            request_id = %request.request_id(),
                            attempt = attempts,
                            status = ?response.as_ref().map(|r| r.status),
                            "Retrying prerender fetch"
                        );
                        RenderState::Fetching
                    } else {
                        match response {
                            Some(response) => RenderState::Relaying(response),
                            None => RenderState::PassThrough,
                        }
                    }
                }
                RenderState::Relaying(mut response) => {
                    response.body = self.hooks.run_body_filter(std::mem::take(&mut response.body))?;
                    response.headers.remove(header::CONTENT_LENGTH);
                    self.hooks.run_after_render(request, &response, attempts)?;
                    return Ok(Disposition::Relay { response, attempts });
                }
                RenderState::PassThrough => {
                    tracing::debug!(
                        request_id = %request.request_id(),
                        attempts,
                        "No prerendered page, passing through"
                    );
                    return Ok(Disposition::PassThrough { attempts });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use crate::hooks::AfterRender;
    use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
    use std::future::ready;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn request() -> RenderRequest {
        RenderRequest::from_request(&Request::get("/").body(()).unwrap())
    }

    fn response(status: StatusCode, body: &str) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        UpstreamResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    struct RecordAttempts(Arc<AtomicU32>);

    impl AfterRender for RecordAttempts {
        fn after_render(
            &self,
            _request: &RenderRequest,
            _response: &UpstreamResponse,
            attempts: u32,
        ) -> Result<(), HookError> {
            self.0.store(attempts, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_may_retry() {
        assert!(!may_retry(0, 1));
        assert!(!may_retry(1, 1));
        assert!(may_retry(2, 1));
        assert!(!may_retry(2, 2));
    }

    #[tokio::test]
    async fn test_retry_limit_bounds_attempts() {
        let seen = Arc::new(AtomicU32::new(0));
        let hooks = Hooks::new()
            .retry_fn(|_req, _resp| true)
            .after_render(RecordAttempts(seen.clone()));
        let controller = RetryController::new(&hooks, 2);

        let mut calls = 0;
        let disposition = controller
            .run(&request(), || {
                calls += 1;
                ready(Some(response(StatusCode::SERVICE_UNAVAILABLE, "busy")))
            })
            .await
            .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        match disposition {
            Disposition::Relay { response, attempts } => {
                assert_eq!(attempts, 2);
                assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("expected relay, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_limit_means_no_retry() {
        let hooks = Hooks::new().retry_fn(|_req, _resp| true);
        let controller = RetryController::new(&hooks, 0);

        let mut calls = 0;
        let disposition = controller
            .run(&request(), || {
                calls += 1;
                ready(None)
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert!(matches!(disposition, Disposition::PassThrough { attempts: 1 }));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let hooks = Hooks::new().retry_fn(|_req, resp| resp.is_none());
        let controller = RetryController::new(&hooks, 5);

        let mut calls = 0;
        let disposition = controller
            .run(&request(), || {
                calls += 1;
                let result = (calls == 3).then(|| response(StatusCode::OK, "ok"));
                ready(result)
            })
            .await
            .unwrap();

        assert_eq!(calls, 3);
        assert!(matches!(disposition, Disposition::Relay { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_relay_filters_body_and_drops_length() {
        let hooks = Hooks::new().body_filter_fn(|body| body.replace("{{name}}", "prerender"));
        let controller = RetryController::new(&hooks, 0);

        let disposition = controller
            .run(&request(), || ready(Some(response(StatusCode::OK, "hello {{name}}"))))
            .await
            .unwrap();

        let Disposition::Relay { response, .. } = disposition else {
            panic!("expected relay");
        };
        assert_eq!(response.body, "hello prerender");
        assert!(response.headers.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(response.headers[header::CONTENT_TYPE], "text/html");
    }

    #[tokio::test]
    async fn test_exhausted_retries_pass_through() {
        let hooks = Hooks::new().retry_fn(|_req, _resp| true);
        let controller = RetryController::new(&hooks, 3);

        let mut calls = 0;
        let disposition = controller
            .run(&request(), || {
                calls += 1;
                ready(None)
            })
            .await
            .unwrap();

        assert_eq!(calls, 3);
        assert!(matches!(disposition, Disposition::PassThrough { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_hook_failure_propagates() {
        struct Broken;
        impl crate::hooks::RetryPolicy for Broken {
            fn should_retry(
                &self,
                _request: &RenderRequest,
                _response: Option<&UpstreamResponse>,
            ) -> Result<bool, HookError> {
                Err(HookError::msg("policy store offline"))
            }
        }

        let hooks = Hooks::new().retry(Broken);
        let controller = RetryController::new(&hooks, 2);
        let err = controller
            .run(&request(), || ready(None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("policy store offline"));
    }
}
