//! Atom feed generation.

use std::sync::Arc;

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use url::Url;

use crate::application::entries::{EntryError, EntryService};
use crate::application::notify::SiteLinks;
use crate::application::render::{ContentRenderer, render_entry};

/// Number of entries carried by the feed.
pub const FEED_SIZE: i64 = 10;

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error("failed to list entries: {0}")]
    Entries(#[from] EntryError),
}

/// Static feed metadata taken from site configuration.
#[derive(Debug, Clone)]
pub struct FeedMeta {
    pub title: String,
    pub author: String,
    pub hub: Option<Url>,
}

#[derive(Clone)]
pub struct SyndicationService {
    entries: EntryService,
    renderer: Arc<dyn ContentRenderer>,
    site: SiteLinks,
    meta: FeedMeta,
}

impl SyndicationService {
    pub fn new(
        entries: EntryService,
        renderer: Arc<dyn ContentRenderer>,
        site: SiteLinks,
        meta: FeedMeta,
    ) -> Self {
        Self {
            entries,
            renderer,
            site,
            meta,
        }
    }

    /// Atom 1.0 document of the newest entries. The feed-level `updated` is
    /// the latest `updated_at` among them, so edits refresh the feed.
    pub async fn atom_feed(&self) -> Result<String, SyndicationError> {
        let records = self.entries.list(FEED_SIZE, 0).await?;

        let updated = records
            .iter()
            .map(|record| record.updated_at)
            .max()
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);

        let mut entries = String::new();
        for record in &records {
            let link = self.site.permalink(&record.id);
            let html = render_entry(self.renderer.as_ref(), &record.content);
            entries.push_str(&format!(
                "  <entry>\n    <title>{}</title>\n    <link href=\"{}\"/>\n    <id>{}</id>\n    <published>{}</published>\n    <updated>{}</updated>\n    <content type=\"html\">{}</content>\n  </entry>\n",
                xml_escape(&record.title),
                xml_escape(&link),
                xml_escape(&link),
                format_timestamp(record.created_at),
                format_timestamp(record.updated_at),
                xml_escape(&html),
            ));
        }

        let feed_url = self.site.feed_url();
        let hub_link = self
            .meta
            .hub
            .as_ref()
            .map(|hub| format!("  <link href=\"{}\" rel=\"hub\"/>\n", xml_escape(hub.as_str())))
            .unwrap_or_default();
        let author = if self.meta.author.trim().is_empty() {
            String::new()
        } else {
            format!(
                "  <author>\n    <name>{}</name>\n  </author>\n",
                xml_escape(&self.meta.author)
            )
        };

        let feed = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<feed xmlns=\"http://www.w3.org/2005/Atom\">\n  <title>{}</title>\n  <id>{}</id>\n  <updated>{}</updated>\n  <link href=\"{}\"/>\n  <link href=\"{}\" rel=\"self\"/>\n{}{}{}</feed>\n",
            xml_escape(&self.meta.title),
            xml_escape(&feed_url),
            format_timestamp(updated),
            xml_escape(self.site.host()),
            xml_escape(&feed_url),
            hub_link,
            author,
            entries
        );

        Ok(feed)
    }
}

fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            xml_escape("<a href=\"x\">Tom & 'Jerry'</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
        );
    }
}
