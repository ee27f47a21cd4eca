//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → request.rs (request ID, RenderRequest snapshot)
//!     → middleware.rs (prerender decision)
//!         ├─ rendered / cached → response.rs (relay, strip hop-by-hop)
//!         └─ declined / pass-through → next handler
//!     → server.rs (origin forwarding fallback)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{prerender_middleware, PrerenderRouterExt};
pub use request::{RenderRequest, X_REQUEST_ID};
pub use server::HttpServer;
