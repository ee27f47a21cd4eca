//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every section has defaults so a minimal file only names what it changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::PatternSpec;

/// Root configuration for the prerender proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Origin server that handles everything not prerendered.
    pub origin: OriginConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Prerender middleware settings.
    pub prerender: PrerenderConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin (next handler) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Prerender middleware configuration.
///
/// Read once when the engine is built; hooks are registered in code.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PrerenderConfig {
    /// Rendering service base URL. Falls back to `PRERENDER_SERVICE_URL`,
    /// then `http://service.prerender.io/`.
    pub service_url: Option<String>,

    /// Service token sent as `X-Prerender-Token`. Falls back to
    /// `PRERENDER_TOKEN`.
    pub token: Option<String>,

    /// Protocol forced into the forwarded URL ("http" or "https").
    pub protocol: Option<String>,

    /// Host forced into the forwarded URL.
    pub host: Option<String>,

    /// Only URLs matching one of these regexes are prerendered.
    pub allowlist: Option<PatternSpec>,

    /// URLs or referers matching one of these regexes are never prerendered.
    pub denylist: Option<PatternSpec>,

    /// Maximum number of fetch attempts when the retry hook asks for one
    /// (0 = no retries).
    pub retry_limit: u32,

    /// Deadline for one fetch in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Extra request options, merged recursively over the generated ones.
    pub request_options: Option<Value>,
}
