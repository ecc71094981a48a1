use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::render::{ContentRenderer, render_entry};

use super::SiteLinks;
use super::links::{LinkError, discover_links};
use super::webmention::{LinkSummary, WebmentionDispatcher};
use super::websub::HubNotifier;

pub use super::webmention::LinkOutcome;
pub use super::websub::HubOutcome;

/// Everything the notification phase did for one entry.
#[derive(Debug)]
pub struct NotificationReport {
    pub entry_id: String,
    pub source: String,
    /// Set when link discovery failed; nothing else was attempted.
    pub aborted: Option<LinkError>,
    pub links: Vec<LinkOutcome>,
    /// `None` only when the phase was aborted before the hub step.
    pub hub: Option<HubOutcome>,
}

impl NotificationReport {
    pub fn sent(&self) -> usize {
        self.links.iter().filter(|outcome| outcome.is_sent()).count()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            entry_id: self.entry_id.clone(),
            source: self.source.clone(),
            aborted: self.aborted.as_ref().map(ToString::to_string),
            links: self.links.iter().map(LinkOutcome::summary).collect(),
            hub: self.hub.as_ref().map(HubOutcome::describe),
        }
    }
}

/// Serializable view of a [`NotificationReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub entry_id: String,
    pub source: String,
    pub aborted: Option<String>,
    pub links: Vec<LinkSummary>,
    pub hub: Option<String>,
}

/// Render → discover links → webmention each → ping hub.
#[derive(Clone)]
pub struct NotificationPipeline {
    renderer: Arc<dyn ContentRenderer>,
    site: SiteLinks,
    dispatcher: WebmentionDispatcher,
    hub: HubNotifier,
}

impl NotificationPipeline {
    pub fn new(
        renderer: Arc<dyn ContentRenderer>,
        site: SiteLinks,
        dispatcher: WebmentionDispatcher,
        hub: HubNotifier,
    ) -> Self {
        Self {
            renderer,
            site,
            dispatcher,
            hub,
        }
    }

    /// Run the notification phase for the entry `id` with body `content`.
    ///
    /// Never fails: every problem is logged and recorded in the report.
    pub async fn run(&self, id: &str, content: &str) -> NotificationReport {
        let source = self.site.permalink(id);
        let html = render_entry(self.renderer.as_ref(), content);

        let targets = match discover_links(&html, &source) {
            Ok(targets) => targets,
            Err(error) => {
                warn!(
                    target: "streamlog::webmention",
                    entry_id = id,
                    source = %source,
                    error = %error,
                    "link discovery failed; skipping notifications"
                );
                return NotificationReport {
                    entry_id: id.to_string(),
                    source,
                    aborted: Some(error),
                    links: Vec::new(),
                    hub: None,
                };
            }
        };

        let links = self.dispatcher.dispatch_all(&source, targets).await;
        let hub = self.hub.notify(&self.site.feed_url()).await;

        let report = NotificationReport {
            entry_id: id.to_string(),
            source,
            aborted: None,
            links,
            hub: Some(hub),
        };

        info!(
            target: "streamlog::webmention",
            entry_id = id,
            links = report.links.len(),
            sent = report.sent(),
            "notification phase complete"
        );

        report
    }
}
