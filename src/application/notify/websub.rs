//! WebSub publish pings.

use metrics::counter;
use reqwest::{Client, header};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::webmention::{FORM_CONTENT_TYPE, form_body};

const METRIC_PING: &str = "streamlog_websub_ping_total";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("hub ping failed: {message}")]
    Transport { message: String },
    #[error("hub responded with status {status}")]
    Status { status: u16 },
}

#[derive(Debug)]
pub enum HubOutcome {
    Notified { hub: Url, status: u16 },
    /// No hub is configured.
    Skipped,
    Failed { hub: Url, error: NotifyError },
}

impl HubOutcome {
    pub fn describe(&self) -> String {
        match self {
            HubOutcome::Notified { hub, status } => format!("notified {hub} (status {status})"),
            HubOutcome::Skipped => "no hub configured".to_string(),
            HubOutcome::Failed { hub, error } => format!("failed {hub}: {error}"),
        }
    }
}

/// Tells the configured hub that the feed changed.
#[derive(Clone)]
pub struct HubNotifier {
    client: Client,
    hub: Option<Url>,
}

impl HubNotifier {
    pub fn new(client: Client, hub: Option<Url>) -> Self {
        Self { client, hub }
    }

    /// POST `hub.mode=publish` for `feed_url`. Failures are logged and
    /// reported, never returned as errors.
    pub async fn notify(&self, feed_url: &str) -> HubOutcome {
        let Some(hub) = self.hub.clone() else {
            debug!(target: "streamlog::websub", "no hub configured; skipping ping");
            return HubOutcome::Skipped;
        };

        match self.ping(&hub, feed_url).await {
            Ok(status) => {
                info!(
                    target: "streamlog::websub",
                    hub = %hub,
                    feed = feed_url,
                    status,
                    "hub notified"
                );
                counter!(METRIC_PING, "outcome" => "ok").increment(1);
                HubOutcome::Notified { hub, status }
            }
            Err(error) => {
                warn!(
                    target: "streamlog::websub",
                    hub = %hub,
                    feed = feed_url,
                    error = %error,
                    "hub ping failed"
                );
                counter!(METRIC_PING, "outcome" => "error").increment(1);
                HubOutcome::Failed { hub, error }
            }
        }
    }

    async fn ping(&self, hub: &Url, feed_url: &str) -> Result<u16, NotifyError> {
        let response = self
            .client
            .post(hub.clone())
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body([("hub.mode", "publish"), ("hub.url", feed_url)]))
            .send()
            .await
            .map_err(|err| NotifyError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }
        Ok(status.as_u16())
    }
}
