//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated)
//!     → Prerender::builder() compiles it into an immutable engine
//!     → shared via Arc with every request
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the engine is built; no runtime setters
//! - All fields have defaults to allow minimal configs
//! - PRERENDER_SERVICE_URL and PRERENDER_TOKEN are read once, at build time

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, OriginConfig, PrerenderConfig, ProxyConfig,
    TimeoutConfig,
};
pub use validation::ValidationError;
