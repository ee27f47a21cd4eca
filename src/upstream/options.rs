//! Request options and their recursive merge.
//!
//! Options are a JSON-like tree so callers can override any part of the
//! outgoing request without knowing the transport's own option types:
//!
//! ```text
//! {
//!   "uri": "http://service.prerender.io/http://example.com/",
//!   "follow_redirect": false,
//!   "timeout_ms": 5000,
//!   "headers": { "User-Agent": "...", "Accept-Encoding": "gzip" }
//! }
//! ```

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::FetchError;
use crate::upstream::UpstreamRequest;

/// Merge `overrides` into `base`.
///
/// Objects are merged key by key, recursively. Any other value in
/// `overrides` (including arrays and null) replaces the one in `base`.
pub fn deep_merge(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overrides) => *base = overrides.clone(),
    }
}

fn header_value(name: &str, value: &Value) -> Result<Option<HeaderValue>, FetchError> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(FetchError::Options(format!(
                "header '{}' has unsupported value {}",
                name, other
            )))
        }
    };
    HeaderValue::from_str(&text)
        .map(Some)
        .map_err(|e| FetchError::Options(format!("header '{}': {}", name, e)))
}

fn headers_from(options: &Map<String, Value>) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    let Some(entries) = options.get("headers") else {
        return Ok(headers);
    };
    let entries = entries
        .as_object()
        .ok_or_else(|| FetchError::Options("'headers' must be a table".to_string()))?;

    for (name, value) in entries {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::Options(format!("header name '{}': {}", name, e)))?;
        match value {
            Value::Array(values) => {
                headers.remove(&header_name);
                for v in values {
                    if let Some(v) = header_value(name, v)? {
                        headers.append(header_name.clone(), v);
                    }
                }
            }
            // `null` removes a header set by an earlier, differently-cased key.
            Value::Null => {
                headers.remove(&header_name);
            }
            v => {
                if let Some(v) = header_value(name, v)? {
                    headers.insert(header_name, v);
                }
            }
        }
    }
    Ok(headers)
}

impl UpstreamRequest {
    /// Interpret a merged option tree.
    pub fn from_options(options: &Value) -> Result<Self, FetchError> {
        let options = options
            .as_object()
            .ok_or_else(|| FetchError::Options("options must be a table".to_string()))?;

        let url = options
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::Options("'uri' must be a string".to_string()))?
            .to_string();

        let follow_redirect = match options.get("follow_redirect") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(FetchError::Options(format!(
                    "'follow_redirect' must be a boolean, got {}",
                    other
                )))
            }
        };

        let timeout = match options.get("timeout_ms") {
            None | Some(Value::Null) => None,
            Some(v) => Some(Duration::from_millis(
                v.as_u64().filter(|ms| *ms > 0).ok_or_else(|| {
                    FetchError::Options(format!(
                        "'timeout_ms' must be a positive integer, got {}",
                        v
                    ))
                })?,
            )),
        };

        Ok(Self {
            url,
            headers: headers_from(options)?,
            follow_redirect,
            timeout,
        })
    }
}
