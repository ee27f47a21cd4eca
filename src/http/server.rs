//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: prerender middleware in front of a fallback
//!   that forwards everything else to the origin application
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve on a listener until shutdown is triggered

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::engine::Prerender;
use crate::http::middleware::PrerenderRouterExt;
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, X_REQUEST_ID,
};
use crate::http::response::strip_hop_by_hop;

/// Application state injected into the origin handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub origin: Authority,
}

/// HTTP server fronting an origin application with prerendering.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server. The origin address must already be
    /// validated.
    pub fn new(config: ProxyConfig, prerender: Arc<Prerender>) -> Result<Self, InvalidUri> {
        let origin = Authority::from_str(&config.origin.address)?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState { client, origin };
        let router = Self::build_router(&config, state, prerender);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, prerender: Arc<Prerender>) -> Router {
        Router::new()
            .fallback(origin_handler)
            .with_state(state)
            .prerender(prerender)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for embedding or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.config.origin.address,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Forward a request the prerender middleware did not answer.
async fn origin_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.origin.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Cannot rewrite request URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    };
    strip_hop_by_hop(&mut parts.headers);
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(X_REQUEST_ID, value);
    }

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding to origin"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Origin request failed");
            (StatusCode::BAD_GATEWAY, "Origin request failed").into_response()
        }
    }
}
