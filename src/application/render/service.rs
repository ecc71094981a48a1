use askama::Template;
use comrak::markdown_to_html;
use tracing::warn;
use url::Url;

use super::ContentRenderer;
use super::config::{build_entry_sanitizer, default_options};

/// Comrak-based markdown rendering with Ammonia sanitisation.
///
/// Each configured bridge URL is appended as an empty anchor after the
/// sanitised body so bridges receive a webmention for every entry.
pub struct ComrakRenderer {
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
    bridge_anchors: String,
}

#[derive(Template)]
#[template(
    source = r#"{% for href in bridges %}{% if !loop.first %} {% endif %}<a href="{{ href }}"></a>{% endfor %}"#,
    ext = "html"
)]
struct BridgeAnchors<'a> {
    bridges: &'a [Url],
}

impl ComrakRenderer {
    pub fn new(bridges: Vec<Url>) -> Self {
        let bridge_anchors = BridgeAnchors { bridges: &bridges }
            .render()
            .unwrap_or_else(|err| {
                warn!(
                    target: "streamlog::render",
                    error = %err,
                    "bridge anchors could not be rendered; entries will not mention bridges"
                );
                String::new()
            });
        Self {
            options: default_options(),
            sanitizer: build_entry_sanitizer(),
            bridge_anchors,
        }
    }
}

impl Default for ComrakRenderer {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ContentRenderer for ComrakRenderer {
    fn render(&self, markdown: &str) -> String {
        let html = markdown_to_html(markdown, &self.options);
        let mut sanitized = self.sanitizer.clean(&html).to_string();
        sanitized.push_str(&self.bridge_anchors);
        sanitized
    }
}
