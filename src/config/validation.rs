//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile allow/deny patterns so bad regexes fail at startup
//! - Validate value ranges and URL shapes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before config is accepted into the system

use serde_json::{json, Value};
use std::net::SocketAddr;
use thiserror::Error;

use crate::classify::{PatternList, PatternSpec};
use crate::config::schema::{PrerenderConfig, ProxyConfig};
use crate::upstream::options::deep_merge;
use crate::upstream::url::DEFAULT_SERVICE_URL;
use crate::upstream::UpstreamRequest;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("prerender.service_url: '{value}' is not an absolute http(s) URL")]
    InvalidServiceUrl { value: String },

    #[error("prerender.protocol: expected 'http' or 'https', got '{value}'")]
    InvalidProtocol { value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("prerender.request_options: must be a table")]
    RequestOptionsNotTable,

    #[error("prerender.request_options: {reason}")]
    InvalidRequestOptions { reason: String },
}

/// Interpret caller options merged over a generated tree, as a fetch would.
fn check_request_options(options: &Value, errors: &mut Vec<ValidationError>) {
    if !options.is_object() {
        errors.push(ValidationError::RequestOptionsNotTable);
        return;
    }
    if options.get("timeout_ms").and_then(Value::as_u64) == Some(0) {
        errors.push(ValidationError::Zero {
            field: "prerender.request_options.timeout_ms",
        });
        return;
    }

    let mut merged = json!({
        "uri": format!("{DEFAULT_SERVICE_URL}http://example.com/"),
        "follow_redirect": false,
        "headers": {
            "Accept-Encoding": "gzip",
            "User-Agent": "Twitterbot",
        },
    });
    deep_merge(&mut merged, options);
    if let Err(e) = UpstreamRequest::from_options(&merged) {
        errors.push(ValidationError::InvalidRequestOptions {
            reason: e.to_string(),
        });
    }
}

fn check_patterns(
    field: &'static str,
    spec: Option<&PatternSpec>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(spec) = spec else { return };
    for pattern in spec.patterns() {
        if let Err(e) = PatternList::compile(&PatternSpec::from(pattern)) {
            errors.push(ValidationError::InvalidPattern {
                field,
                pattern: pattern.to_string(),
                reason: e.to_string(),
            });
        }
    }
}

/// Validate the prerender section on its own.
pub fn validate_prerender(config: &PrerenderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(service_url) = &config.service_url {
        let valid = url::Url::parse(service_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidServiceUrl {
                value: service_url.clone(),
            });
        }
    }

    if let Some(protocol) = &config.protocol {
        if protocol != "http" && protocol != "https" {
            errors.push(ValidationError::InvalidProtocol {
                value: protocol.clone(),
            });
        }
    }

    check_patterns("prerender.allowlist", config.allowlist.as_ref(), &mut errors);
    check_patterns("prerender.denylist", config.denylist.as_ref(), &mut errors);

    if config.timeout_ms == Some(0) {
        errors.push(ValidationError::Zero {
            field: "prerender.timeout_ms",
        });
    }

    if let Some(options) = &config.request_options {
        check_request_options(options, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the whole configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("listener.bind_address", &config.listener.bind_address),
        ("origin.address", &config.origin.address),
    ] {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }

    if let Err(prerender_errors) = validate_prerender(&config.prerender) {
        errors.extend(prerender_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
