//! Error types shared across the prerender pipeline.

use std::time::Duration;
use thiserror::Error;

/// Boxed error used by user-supplied hooks and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while fetching a page from the rendering service.
///
/// None of these reach the original caller: the fetcher logs them and
/// reports "no response", which feeds the retry / pass-through path.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Merged request options could not be turned into a request.
    #[error("invalid request options: {0}")]
    Options(String),

    /// Connection, DNS or mid-transfer failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Error raised by a custom transport implementation.
    #[error("transport error: {0}")]
    Other(BoxError),

    /// No response within the configured deadline.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The body declared an encoding it could not be decoded from.
    #[error("failed to decode {encoding} body: {source}")]
    Decode {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by an injected hook.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HookError(#[from] BoxError);

impl HookError {
    /// Wrap any error.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }

    /// Build a hook error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }
}

/// Errors surfaced by the middleware to the host server.
#[derive(Debug, Error)]
pub enum PrerenderError {
    /// An injected hook failed; the host's error handling takes over.
    #[error("{hook} hook failed: {source}")]
    Hook {
        hook: &'static str,
        #[source]
        source: HookError,
    },
}

impl PrerenderError {
    pub(crate) fn hook(hook: &'static str) -> impl FnOnce(HookError) -> Self {
        move |source| Self::Hook { hook, source }
    }
}
