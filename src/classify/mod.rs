//! Request classification.
//!
//! # Rules (in order)
//! 1. No user agent → do not prerender
//! 2. Method other than GET/HEAD → do not prerender
//! 3. `_escaped_fragment_` in the query, a crawler user agent, or an
//!    `x-bufferbot` header → candidate for prerendering
//! 4. Static asset extension in the URL → do not prerender
//! 5. Allow-list configured and no pattern matches the URL → do not prerender
//! 6. Deny-list matches the URL or the referer → do not prerender
//! 7. Otherwise the candidate flag from step 3
//!
//! # Design Decisions
//! - Missing or malformed headers default to "do not prerender"
//! - Patterns are regex searches against the raw URL (path + query)

pub mod crawlers;
pub mod patterns;

use axum::http::{HeaderName, Method};

use crate::http::request::RenderRequest;

pub use crawlers::{has_ignored_extension, is_crawler, CRAWLER_USER_AGENTS, IGNORED_EXTENSIONS};
pub use patterns::{PatternList, PatternSpec};

/// Query key of the escaped-fragment crawling convention.
pub const ESCAPED_FRAGMENT: &str = "_escaped_fragment_";

/// Header sent by Buffer's link fetcher.
pub const X_BUFFERBOT: HeaderName = HeaderName::from_static("x-bufferbot");

/// Decides whether a request gets a prerendered page.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    allowlist: Option<PatternList>,
    denylist: Option<PatternList>,
}

impl Classifier {
    pub fn new(allowlist: Option<PatternList>, denylist: Option<PatternList>) -> Self {
        Self {
            allowlist,
            denylist,
        }
    }

    pub fn should_prerender(&self, request: &RenderRequest) -> bool {
        let Some(user_agent) = request.user_agent() else {
            return false;
        };

        if request.method() != Method::GET && request.method() != Method::HEAD {
            return false;
        }

        let requested = has_escaped_fragment(request.query())
            || is_crawler(user_agent)
            || request.headers().contains_key(X_BUFFERBOT);

        let url = request.url();

        if has_ignored_extension(url) {
            return false;
        }

        if let Some(allowlist) = &self.allowlist {
            if !allowlist.any_match(url) {
                return false;
            }
        }

        if let Some(denylist) = &self.denylist {
            let referer_denied = request
                .referer()
                .map(|referer| denylist.any_match(referer))
                .unwrap_or(false);
            if denylist.any_match(url) || referer_denied {
                return false;
            }
        }

        requested
    }
}

/// True if the query string carries an `_escaped_fragment_` key, with or
/// without a value.
pub fn has_escaped_fragment(query: Option<&str>) -> bool {
    query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == ESCAPED_FRAGMENT))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    const BROWSER: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0";
    const CRAWLER: &str = "facebookexternalhit/1.1";

    fn request(method: &str, uri: &str, user_agent: Option<&str>) -> RenderRequest {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ua) = user_agent {
            builder = builder.header("user-agent", ua);
        }
        RenderRequest::from_request(&builder.body(()).unwrap())
    }

    fn lists(allow: Option<&str>, deny: Option<&str>) -> Classifier {
        let compile = |p: &str| PatternList::compile(&PatternSpec::from(p)).unwrap();
        Classifier::new(allow.map(compile), deny.map(compile))
    }

    #[test]
    fn test_no_user_agent() {
        let classifier = Classifier::default();
        assert!(!classifier.should_prerender(&request("GET", "/?_escaped_fragment_=", None)));
    }

    #[test]
    fn test_non_get_methods_rejected() {
        let classifier = Classifier::default();
        for method in ["POST", "PUT", "DELETE", "PATCH", "OPTIONS"] {
            assert!(
                !classifier.should_prerender(&request(method, "/?_escaped_fragment_=", Some(CRAWLER))),
                "method {method}"
            );
        }
        assert!(classifier.should_prerender(&request("HEAD", "/", Some(CRAWLER))));
    }

    #[test]
    fn test_escaped_fragment_requests_prerender() {
        let classifier = Classifier::default();
        assert!(classifier.should_prerender(&request("GET", "/page?_escaped_fragment_=", Some(BROWSER))));
        assert!(classifier.should_prerender(&request("GET", "/page?_escaped_fragment_", Some(BROWSER))));
        assert!(classifier.should_prerender(&request(
            "GET",
            "/page?a=1&_escaped_fragment_=/about",
            Some(BROWSER)
        )));
        assert!(!classifier.should_prerender(&request("GET", "/page?escaped=1", Some(BROWSER))));
    }

    #[test]
    fn test_crawler_user_agent() {
        let classifier = Classifier::default();
        assert!(classifier.should_prerender(&request("GET", "/", Some(CRAWLER))));
        assert!(!classifier.should_prerender(&request("GET", "/", Some(BROWSER))));
    }

    #[test]
    fn test_bufferbot_header() {
        let req = Request::get("/")
            .header("user-agent", BROWSER)
            .header("x-bufferbot", "1")
            .body(())
            .unwrap();
        assert!(Classifier::default().should_prerender(&RenderRequest::from_request(&req)));
    }

    #[test]
    fn test_static_assets_never_prerendered() {
        let classifier = Classifier::default();
        for uri in ["/app.js", "/style.css", "/logo.png", "/feed.rss?_escaped_fragment_="] {
            assert!(!classifier.should_prerender(&request("GET", uri, Some(CRAWLER))), "uri {uri}");
        }
    }

    #[test]
    fn test_allowlist() {
        let classifier = lists(Some("^/blog"), None);
        assert!(classifier.should_prerender(&request("GET", "/blog/post", Some(CRAWLER))));
        assert!(!classifier.should_prerender(&request("GET", "/shop", Some(CRAWLER))));
    }

    #[test]
    fn test_denylist_url_and_referer() {
        let classifier = lists(None, Some("private|spam\\.com"));
        assert!(!classifier.should_prerender(&request("GET", "/private/page", Some(CRAWLER))));
        assert!(classifier.should_prerender(&request("GET", "/public", Some(CRAWLER))));

        let req = Request::get("/public")
            .header("user-agent", CRAWLER)
            .header("referer", "http://spam.com/links")
            .body(())
            .unwrap();
        assert!(!classifier.should_prerender(&RenderRequest::from_request(&req)));
    }

    #[test]
    fn test_lists_do_not_force_prerender() {
        let classifier = lists(Some("^/"), None);
        assert!(!classifier.should_prerender(&request("GET", "/page", Some(BROWSER))));
    }
}
