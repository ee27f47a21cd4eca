//! Rendering-service URL construction.

use regex::Regex;
use std::sync::OnceLock;

use crate::classify::ESCAPED_FRAGMENT;
use crate::http::request::RenderRequest;

/// Rendering service used when nothing else is configured.
pub const DEFAULT_SERVICE_URL: &str = "http://service.prerender.io/";

/// Environment variable overriding the default service URL.
pub const SERVICE_URL_ENV: &str = "PRERENDER_SERVICE_URL";

/// Resolve the service URL: explicit value, then environment, then default.
pub fn resolve_service_url(configured: Option<&str>) -> String {
    resolve_service_url_from(configured, std::env::var(SERVICE_URL_ENV).ok())
}

/// Same as [`resolve_service_url`] with the environment value passed in.
pub fn resolve_service_url_from(configured: Option<&str>, env: Option<String>) -> String {
    configured
        .map(str::to_string)
        .or_else(|| env.filter(|v| !v.is_empty()))
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string())
}

fn cf_visitor_scheme(header: &str) -> Option<&str> {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    let re = SCHEME.get_or_init(|| {
        Regex::new(r#""scheme":"(http|https)""#).expect("static CF-Visitor regex")
    });
    re.captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Builds `{service}/{protocol}://{host}{path}?{query}` for a request.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    service_url: String,
    protocol: Option<String>,
    host: Option<String>,
}

impl UrlBuilder {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            protocol: None,
            host: None,
        }
    }

    /// Force the protocol of the forwarded URL.
    pub fn protocol(mut self, protocol: Option<String>) -> Self {
        self.protocol = protocol;
        self
    }

    /// Force the host of the forwarded URL.
    pub fn host(mut self, host: Option<String>) -> Self {
        self.host = host;
        self
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Protocol of the original request.
    ///
    /// Later sources win: request, `CF-Visitor`, `X-Forwarded-Proto`,
    /// configured override.
    pub fn protocol_for<'a>(&'a self, request: &'a RenderRequest) -> &'a str {
        let mut protocol = request.protocol();

        if let Some(scheme) = request.header("cf-visitor").and_then(cf_visitor_scheme) {
            protocol = scheme;
        }
        if let Some(forwarded) = request.header("x-forwarded-proto") {
            protocol = forwarded.split(',').next().unwrap_or(forwarded).trim();
        }
        if let Some(configured) = &self.protocol {
            protocol = configured;
        }
        protocol
    }

    /// The original URL as the crawler would have seen it, minus the
    /// escaped-fragment marker.
    pub fn original_url(&self, request: &RenderRequest) -> String {
        let host = self
            .host
            .as_deref()
            .or_else(|| request.host())
            .unwrap_or_default();

        let mut full_url = format!("{}://{}{}", self.protocol_for(request), host, request.path());

        let query = rebuild_query(request.query());
        if !query.is_empty() {
            full_url.push('?');
            full_url.push_str(&query);
        }
        full_url
    }

    pub fn build(&self, request: &RenderRequest) -> String {
        let separator = if self.service_url.ends_with('/') { "" } else { "/" };
        format!("{}{}{}", self.service_url, separator, self.original_url(request))
    }
}

/// Characters left unescaped in query components besides `A-Za-z0-9-_.~`.
const QUERY_SAFE: [(&str, char); 5] = [
    ("%21", '!'),
    ("%27", '\''),
    ("%28", '('),
    ("%29", ')'),
    ("%2A", '*'),
];

/// Percent-encode a query key or value, keeping `!'()*` literal.
fn escape_component(raw: &str) -> String {
    let mut encoded = urlencoding::encode(raw).into_owned();
    for (escaped, literal) in QUERY_SAFE {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, &literal.to_string());
        }
    }
    encoded
}

/// Re-encode the query parameters without `_escaped_fragment_`.
///
/// Repeated keys and their order are kept.
pub fn rebuild_query(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key != ESCAPED_FRAGMENT)
        .map(|(key, value)| {
            format!("{}={}", escape_component(&key), escape_component(&value))
        })
        .collect::<Vec<_>>()
        .join("&")
}
