//! Outbound notifications sent after an entry is written: webmentions to
//! every page the entry links to, then a WebSub ping for the feed.

pub mod document;
pub mod endpoint;
pub mod links;
pub mod pipeline;
pub mod webmention;
pub mod websub;

use url::Url;

pub use pipeline::{
    HubOutcome, LinkOutcome, NotificationPipeline, NotificationReport, ReportSummary,
};

/// Public URLs derived from the configured site host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLinks {
    host: String,
}

impl SiteLinks {
    /// `host` is an absolute base such as `https://stream.example`; a trailing
    /// slash is dropped.
    pub fn new(host: &Url) -> Self {
        Self {
            host: host.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `{host}/entry/{id}`
    pub fn permalink(&self, id: &str) -> String {
        format!("{}/entry/{id}", self.host)
    }

    /// `{host}/feed`
    pub fn feed_url(&self) -> String {
        format!("{}/feed", self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_rooted_at_host() {
        let host = Url::parse("https://stream.example/").expect("url");
        let links = SiteLinks::new(&host);
        assert_eq!(links.permalink("abc"), "https://stream.example/entry/abc");
        assert_eq!(links.feed_url(), "https://stream.example/feed");
    }

    #[test]
    fn host_with_path_keeps_prefix() {
        let host = Url::parse("https://example.org/stream").expect("url");
        let links = SiteLinks::new(&host);
        assert_eq!(links.permalink("x1"), "https://example.org/stream/entry/x1");
    }
}
