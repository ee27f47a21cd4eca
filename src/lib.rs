//! Prerender middleware for axum.
//!
//! Requests from search engine and social crawlers are answered with a
//! fully rendered page fetched from a prerender rendering service; every
//! other request reaches the host application unchanged.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use config::{PrerenderConfig, ProxyConfig};
pub use engine::{Outcome, Prerender, PrerenderBuilder};
pub use error::{FetchError, HookError, PrerenderError};
pub use hooks::{CachedRender, Hooks};
pub use http::{HttpServer, PrerenderRouterExt, RenderRequest};
pub use lifecycle::Shutdown;
