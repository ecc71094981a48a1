//! Markdown rendering.
//!
//! Rendering is a pure function from markdown source to sanitised HTML. The
//! notification pipeline and the HTTP views both go through [`ContentRenderer`]
//! so they see identical markup, and therefore identical outbound links.

mod config;
mod service;

pub use service::ComrakRenderer;

/// Converts entry markdown to sanitised HTML.
pub trait ContentRenderer: Send + Sync {
    /// Render `markdown`. Callers pass source that has already gone through
    /// [`normalize_line_endings`].
    fn render(&self, markdown: &str) -> String;
}

/// Collapse `\r\n` pairs to `\n`. Browsers submit form text with CRLF line
/// endings, which changes how markdown breaks paragraphs.
pub fn normalize_line_endings(source: &str) -> String {
    source.replace("\r\n", "\n")
}

/// Normalise and render in one step.
pub fn render_entry(renderer: &dyn ContentRenderer, markdown: &str) -> String {
    renderer.render(&normalize_line_endings(markdown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_pairs_collapse() {
        assert_eq!(normalize_line_endings("a\r\nb\r\n\r\nc"), "a\nb\n\nc");
        assert_eq!(normalize_line_endings("lone\rcarriage"), "lone\rcarriage");
    }
}
