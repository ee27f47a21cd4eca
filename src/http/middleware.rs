//! Prerender middleware.
//!
//! Wraps any axum router: crawler requests are answered from the rendering
//! service (or the cache hook), everything else reaches the inner handler
//! untouched.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/", get(index))
//!     .prerender(Arc::new(Prerender::builder().build()?));
//! ```

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::sync::Arc;

use crate::engine::{Outcome, Prerender};
use crate::error::PrerenderError;
use crate::http::request::RenderRequest;
use crate::http::response::{cached_response, relay_response};
use crate::observability::metrics;

pub async fn prerender_middleware(
    State(prerender): State<Arc<Prerender>>,
    request: Request,
    next: Next,
) -> Result<Response, PrerenderError> {
    let render_request = RenderRequest::from_request(&request);

    let outcome = prerender.handle(&render_request).await;
    metrics::record_outcome(match &outcome {
        Ok(outcome) => outcome.label(),
        Err(_) => "hook_error",
    });

    match outcome? {
        Outcome::Declined | Outcome::PassThrough => Ok(next.run(request).await),
        Outcome::Cached(cached) => Ok(cached_response(cached)),
        Outcome::Rendered(upstream) => Ok(relay_response(upstream)),
    }
}

/// Install the prerender middleware on a router.
pub trait PrerenderRouterExt {
    fn prerender(self, prerender: Arc<Prerender>) -> Self;
}

impl<S> PrerenderRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn prerender(self, prerender: Arc<Prerender>) -> Self {
        self.layer(middleware::from_fn_with_state(prerender, prerender_middleware))
    }
}
