//! Webmention sending.

use futures::{StreamExt, stream};
use metrics::counter;
use reqwest::{Client, header};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::{Url, form_urlencoded};

use super::endpoint::{DiscoveryError, discover_endpoint};

const METRIC_SENT: &str = "streamlog_webmention_sent_total";
const METRIC_FAILED: &str = "streamlog_webmention_failed_total";

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Error)]
pub enum SendError {
    #[error("sending webmention failed: {message}")]
    Transport { message: String },
    #[error("endpoint responded with status {status}")]
    Status { status: u16 },
}

/// What happened to a single outbound link.
#[derive(Debug)]
pub enum LinkOutcome {
    /// The endpoint accepted the webmention (any status below 400).
    Sent {
        target: Url,
        endpoint: Url,
        status: u16,
    },
    /// No usable endpoint could be found; nothing was sent.
    Skipped { target: Url, error: DiscoveryError },
    /// An endpoint was found but the send failed.
    Failed {
        target: Url,
        endpoint: Url,
        error: SendError,
    },
}

impl LinkOutcome {
    pub fn target(&self) -> &Url {
        match self {
            LinkOutcome::Sent { target, .. }
            | LinkOutcome::Skipped { target, .. }
            | LinkOutcome::Failed { target, .. } => target,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, LinkOutcome::Sent { .. })
    }

    pub fn summary(&self) -> LinkSummary {
        match self {
            LinkOutcome::Sent {
                target,
                endpoint,
                status,
            } => LinkSummary {
                target: target.to_string(),
                outcome: "sent",
                endpoint: Some(endpoint.to_string()),
                detail: format!("status {status}"),
            },
            LinkOutcome::Skipped { target, error } => LinkSummary {
                target: target.to_string(),
                outcome: "skipped",
                endpoint: None,
                detail: error.to_string(),
            },
            LinkOutcome::Failed {
                target,
                endpoint,
                error,
            } => LinkSummary {
                target: target.to_string(),
                outcome: "failed",
                endpoint: Some(endpoint.to_string()),
                detail: error.to_string(),
            },
        }
    }
}

/// Flat, printable form of a [`LinkOutcome`].
#[derive(Debug, Clone, Serialize)]
pub struct LinkSummary {
    pub target: String,
    pub outcome: &'static str,
    pub endpoint: Option<String>,
    pub detail: String,
}

/// `application/x-www-form-urlencoded` body for the given pairs.
pub(crate) fn form_body<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Discovers and notifies the endpoint of every link of an entry.
///
/// Links are independent: a failure on one never stops the others, and
/// nothing is retried.
#[derive(Clone)]
pub struct WebmentionDispatcher {
    client: Client,
    concurrency: usize,
}

impl WebmentionDispatcher {
    /// `concurrency` bounds in-flight links; `1` processes them in order.
    pub fn new(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// POST `source` and `target` to `endpoint`. Status 400 and above counts as
    /// a failure.
    pub async fn send(&self, endpoint: &Url, source: &str, target: &Url) -> Result<u16, SendError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(form_body([("source", source), ("target", target.as_str())]))
            .send()
            .await
            .map_err(|err| SendError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(SendError::Status { status });
        }
        Ok(status)
    }

    /// Handle one link end to end and log the result.
    pub async fn dispatch_one(&self, source: &str, target: Url) -> LinkOutcome {
        let endpoint = match discover_endpoint(&self.client, &target).await {
            Ok(endpoint) => endpoint,
            Err(error) => {
                warn!(
                    target: "streamlog::webmention",
                    source,
                    link = %target,
                    error = %error,
                    "no webmention endpoint; skipping link"
                );
                counter!(METRIC_FAILED, "stage" => "discovery").increment(1);
                return LinkOutcome::Skipped { target, error };
            }
        };

        match self.send(&endpoint, source, &target).await {
            Ok(status) => {
                info!(
                    target: "streamlog::webmention",
                    source,
                    link = %target,
                    endpoint = %endpoint,
                    status,
                    "webmention sent"
                );
                counter!(METRIC_SENT).increment(1);
                LinkOutcome::Sent {
                    target,
                    endpoint,
                    status,
                }
            }
            Err(error) => {
                warn!(
                    target: "streamlog::webmention",
                    source,
                    link = %target,
                    endpoint = %endpoint,
                    error = %error,
                    "webmention send failed"
                );
                counter!(METRIC_FAILED, "stage" => "send").increment(1);
                LinkOutcome::Failed {
                    target,
                    endpoint,
                    error,
                }
            }
        }
    }

    /// Dispatch every link. Outcomes are returned in input order.
    pub async fn dispatch_all(
        &self,
        source: &str,
        targets: impl IntoIterator<Item = Url>,
    ) -> Vec<LinkOutcome> {
        stream::iter(targets)
            .map(|target| self.dispatch_one(source, target))
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_encodes_reserved_characters() {
        let body = form_body([
            ("source", "https://stream.example/entry/a b"),
            ("target", "https://t.example/?q=1&r=2"),
        ]);
        assert_eq!(
            body,
            "source=https%3A%2F%2Fstream.example%2Fentry%2Fa+b&target=https%3A%2F%2Ft.example%2F%3Fq%3D1%26r%3D2"
        );
    }

    #[test]
    fn summary_reports_skip_reason() {
        let outcome = LinkOutcome::Skipped {
            target: Url::parse("https://t.example/").expect("url"),
            error: DiscoveryError::NotAdvertised,
        };
        let summary = outcome.summary();
        assert_eq!(summary.outcome, "skipped");
        assert!(summary.endpoint.is_none());
        assert!(!outcome.is_sent());
    }
}
