//! Webmention endpoint discovery.

use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use reqwest::{Client, header};
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::document::{MAX_DOCUMENT_BYTES, read_capped};

const WEBMENTION_REL: &str = "webmention";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("fetching target failed: {message}")]
    Transport { message: String },
    #[error("target responded with status {status}")]
    Status { status: u16 },
    #[error("target does not advertise a webmention endpoint")]
    NotAdvertised,
    #[error("target document could not be scanned: {message}")]
    Document { message: String },
    #[error("advertised endpoint `{href}` is not a valid url: {message}")]
    InvalidEndpoint { href: String, message: String },
}

/// Fetch `target` and locate the webmention endpoint it advertises.
///
/// A `Link` response header with `rel="webmention"` takes precedence over
/// markup. Otherwise the first `<link>` or `<a>` element whose `rel` contains
/// `webmention` wins. The endpoint is resolved against the final response URL
/// so redirects and relative references behave like a browser would.
pub async fn discover_endpoint(client: &Client, target: &Url) -> Result<Url, DiscoveryError> {
    let response = client
        .get(target.clone())
        .header(header::ACCEPT, "text/html, */*;q=0.5")
        .send()
        .await
        .map_err(|err| DiscoveryError::Transport {
            message: err.to_string(),
        })?;

    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(DiscoveryError::Status {
            status: status.as_u16(),
        });
    }

    let base = response.url().clone();

    let from_header = endpoint_from_link_headers(
        response
            .headers()
            .get_all(header::LINK)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    );
    if let Some(href) = from_header {
        return resolve_endpoint(&base, &href);
    }

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_none_or(|value| value.to_ascii_lowercase().contains("html"));
    if !is_html {
        return Err(DiscoveryError::NotAdvertised);
    }

    let body = read_capped(response, MAX_DOCUMENT_BYTES)
        .await
        .map_err(|err| DiscoveryError::Transport {
            message: err.to_string(),
        })?;
    if body.truncated {
        debug!(
            target: "streamlog::webmention",
            target_url = %target,
            limit = MAX_DOCUMENT_BYTES,
            "target document truncated before scanning"
        );
    }

    match endpoint_from_html(&body.text)? {
        Some(href) => resolve_endpoint(&base, &href),
        None => Err(DiscoveryError::NotAdvertised),
    }
}

fn resolve_endpoint(base: &Url, href: &str) -> Result<Url, DiscoveryError> {
    let endpoint = base
        .join(href.trim())
        .map_err(|err| DiscoveryError::InvalidEndpoint {
            href: href.to_string(),
            message: err.to_string(),
        })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(DiscoveryError::InvalidEndpoint {
            href: href.to_string(),
            message: format!("unsupported scheme `{}`", endpoint.scheme()),
        });
    }
    Ok(endpoint)
}

fn rel_contains_webmention(rel: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case(WEBMENTION_REL))
}

/// First target of a `Link` header value (RFC 8288) whose `rel` parameter
/// contains `webmention`. Several header lines and comma-separated link
/// values are both accepted.
pub(crate) fn endpoint_from_link_headers<'a>(
    values: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    values
        .into_iter()
        .flat_map(parse_link_values)
        .find(|(_, rel)| rel.as_deref().is_some_and(rel_contains_webmention))
        .map(|(target, _)| target)
}

/// Split one `Link` header value into `(target, rel)` pairs.
fn parse_link_values(value: &str) -> Vec<(String, Option<String>)> {
    let mut links = Vec::new();
    let mut rest = value;

    while let Some(open) = rest.find('<') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('>') else {
            break;
        };
        let target = after_open[..close].to_string();
        let params_start = &after_open[close + 1..];

        // Parameters run until the comma that starts the next link value.
        match next_link_separator(params_start) {
            Some(comma) => {
                links.push((target, rel_param(&params_start[..comma])));
                rest = &params_start[comma + 1..];
            }
            None => {
                links.push((target, rel_param(params_start)));
                break;
            }
        }
    }

    links
}

fn next_link_separator(params: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (index, ch) in params.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(index),
            _ => {}
        }
    }
    None
}

fn rel_param(params: &str) -> Option<String> {
    params
        .split(';')
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rel"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

/// `href` of the first `<link>` or `<a>` whose `rel` contains `webmention`.
/// A present but empty `href` is returned as an empty string.
pub(crate) fn endpoint_from_html(html: &str) -> Result<Option<String>, DiscoveryError> {
    let found = Rc::new(RefCell::new(None::<String>));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("link[rel][href], a[rel][href]", {
                let found = Rc::clone(&found);
                move |el| {
                    if found.borrow().is_some() {
                        return Ok(());
                    }
                    let rel = el.get_attribute("rel").unwrap_or_default();
                    if rel_contains_webmention(&rel)
                        && let Some(href) = el.get_attribute("href")
                    {
                        *found.borrow_mut() = Some(href);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| DiscoveryError::Document {
        message: err.to_string(),
    })?;

    Ok(found.take())
}
