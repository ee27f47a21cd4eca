//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Middleware and fetcher produce:
//!     → logging.rs (structured log events, request_id on every line)
//!     → metrics.rs (outcome counters, fetch latency)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
