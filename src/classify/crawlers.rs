//! Crawler signatures and static-asset extensions.

/// User agent fragments of crawlers that get prerendered pages.
///
/// googlebot, yahoo and bingbot are absent on purpose: they support the
/// `_escaped_fragment_` convention, and serving them a different page by
/// user agent could be seen as cloaking.
pub const CRAWLER_USER_AGENTS: &[&str] = &[
    "baiduspider",
    "facebookexternalhit",
    "twitterbot",
    "rogerbot",
    "linkedinbot",
    "embedly",
    "quora link preview",
    "showyoubot",
    "outbrain",
    "pinterest",
    "developers.google.com/+/web/snippet",
    "slackbot",
    "vkShare",
    "W3C_Validator",
];

/// URL fragments identifying static assets, which are never prerendered.
pub const IGNORED_EXTENSIONS: &[&str] = &[
    ".js", ".css", ".xml", ".less", ".png", ".jpg", ".jpeg", ".gif", ".pdf", ".doc", ".txt",
    ".ico", ".rss", ".zip", ".mp3", ".rar", ".exe", ".wmv", ".doc", ".avi", ".ppt", ".mpg",
    ".mpeg", ".tif", ".wav", ".mov", ".psd", ".ai", ".xls", ".mp4", ".m4a", ".swf", ".dat",
    ".dmg", ".iso", ".flv", ".m4v", ".torrent",
];

/// Case-insensitive check against the crawler signature list.
pub fn is_crawler(user_agent: &str) -> bool {
    let user_agent = user_agent.to_lowercase();
    CRAWLER_USER_AGENTS
        .iter()
        .any(|crawler| user_agent.contains(&crawler.to_lowercase()))
}

/// True when the raw URL contains a static-asset extension anywhere.
pub fn has_ignored_extension(url: &str) -> bool {
    IGNORED_EXTENSIONS.iter().any(|ext| url.contains(ext))
}
