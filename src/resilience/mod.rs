//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Prerender request:
//!     → upstream fetch (deadline enforced by the fetcher)
//!     → retries.rs (retry policy, bounded by retry_limit)
//!     → relay or pass through to the next handler
//! ```
//!
//! # Design Decisions
//! - Whether a response is worth retrying is decided by the retry hook, not
//!   by status code
//! - An unrecoverable failure behaves as if the middleware were absent

pub mod retries;

pub use retries::{Disposition, RenderState, RetryController};
