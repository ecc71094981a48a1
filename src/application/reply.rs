//! Reply context for entries written in response to another page.
//!
//! A reply starts with a `u-in-reply-to` anchor pointing at the canonical URL
//! of the page being answered. The anchor survives sanitisation, so link
//! discovery picks it up and the page receives a webmention like any other
//! link.

use std::{cell::RefCell, rc::Rc};

use askama::Template;
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use reqwest::{Client, header};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::notify::document::{MAX_DOCUMENT_BYTES, read_capped};

#[derive(Debug, Error)]
pub enum ReplyContextError {
    #[error("fetching `{url}` failed: {message}")]
    Transport { url: Url, message: String },
    #[error("`{url}` responded with status {status}")]
    Status { url: Url, status: u16 },
    #[error("`{url}` is not an html document")]
    NotHtml { url: Url },
    #[error("document could not be scanned: {message}")]
    Document { message: String },
    #[error("reply anchor could not be rendered")]
    Markup(#[from] askama::Error),
}

/// What we learned about the page being replied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    /// `link[rel=canonical]` when the page declares one, else the final
    /// response URL.
    pub canonical: Url,
    /// Text of the first `<title>`, whitespace collapsed. Empty when absent.
    pub title: String,
}

impl ReplyContext {
    /// `<a class="u-in-reply-to" href="…">title</a>`, escaped. The URL stands
    /// in for a missing title.
    pub fn anchor(&self) -> Result<String, askama::Error> {
        let text = if self.title.is_empty() {
            self.canonical.as_str()
        } else {
            self.title.as_str()
        };
        ReplyAnchor {
            href: self.canonical.as_str(),
            text,
        }
        .render()
    }
}

#[derive(Template)]
#[template(
    source = r#"<a class="u-in-reply-to" href="{{ href }}">{{ text }}</a>"#,
    ext = "html"
)]
struct ReplyAnchor<'a> {
    href: &'a str,
    text: &'a str,
}

/// Title and content to prefill a new entry with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
}

#[derive(Clone)]
pub struct ReplyContextFetcher {
    client: Client,
}

impl ReplyContextFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &Url) -> Result<ReplyContext, ReplyContextError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|err| ReplyContextError::Transport {
                url: url.clone(),
                message: err.to_string(),
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ReplyContextError::Status {
                url: url.clone(),
                status,
            });
        }

        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_none_or(|value| value.to_ascii_lowercase().contains("html"));
        if !is_html {
            return Err(ReplyContextError::NotHtml { url: url.clone() });
        }

        let base = response.url().clone();
        let body = read_capped(response, MAX_DOCUMENT_BYTES)
            .await
            .map_err(|err| ReplyContextError::Transport {
                url: url.clone(),
                message: err.to_string(),
            })?;

        let (canonical, title) = scan_document(&body.text)?;
        let canonical = canonical
            .and_then(|href| base.join(href.trim()).ok())
            .filter(|canonical| matches!(canonical.scheme(), "http" | "https"))
            .unwrap_or(base);

        debug!(
            target: "streamlog::reply",
            url = %url,
            canonical = %canonical,
            "reply context fetched"
        );

        Ok(ReplyContext { canonical, title })
    }

    /// The opening anchor of a reply to `url`. When the page cannot be
    /// fetched the anchor points at `url` itself.
    pub async fn reply_anchor(&self, url: &Url) -> Result<String, ReplyContextError> {
        let context = match self.fetch(url).await {
            Ok(context) => context,
            Err(error) => {
                warn!(
                    target: "streamlog::reply",
                    url = %url,
                    error = %error,
                    "reply context unavailable; linking the url as given"
                );
                ReplyContext {
                    canonical: url.clone(),
                    title: String::new(),
                }
            }
        };
        Ok(context.anchor()?)
    }

    /// Draft for a page shared from a browser: `text` is usually the shared
    /// URL, `url` the fallback. The page title becomes the entry title and
    /// the reply anchor its content. Without a usable URL, or when the page
    /// cannot be fetched, the shared title and text come back unchanged.
    pub async fn share_draft(&self, title: &str, text: &str, url: Option<&str>) -> EntryDraft {
        let unchanged = EntryDraft {
            title: title.to_string(),
            content: text.to_string(),
        };

        let Some(shared) = shared_url(text).or_else(|| url.and_then(shared_url)) else {
            return unchanged;
        };

        let context = match self.fetch(&shared).await {
            Ok(context) => context,
            Err(error) => {
                info!(
                    target: "streamlog::reply",
                    url = %shared,
                    error = %error,
                    "shared page could not be fetched"
                );
                return unchanged;
            }
        };

        match context.anchor() {
            Ok(content) => EntryDraft {
                title: context.title,
                content,
            },
            Err(error) => {
                warn!(
                    target: "streamlog::reply",
                    url = %shared,
                    error = %error,
                    "reply anchor could not be rendered"
                );
                unchanged
            }
        }
    }
}

fn shared_url(candidate: &str) -> Option<Url> {
    Url::parse(candidate.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Canonical `href` and first `<title>` text of `html`, entities decoded.
fn scan_document(html: &str) -> Result<(Option<String>, String), ReplyContextError> {
    let canonical = Rc::new(RefCell::new(None::<String>));
    let title = Rc::new(RefCell::new(String::new()));
    let title_done = Rc::new(RefCell::new(false));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("link[rel~=canonical][href]", {
                    let canonical = Rc::clone(&canonical);
                    move |el| {
                        if canonical.borrow().is_none() {
                            *canonical.borrow_mut() = el.get_attribute("href");
                        }
                        Ok(())
                    }
                }),
                text!("title", {
                    let title = Rc::clone(&title);
                    let title_done = Rc::clone(&title_done);
                    move |chunk| {
                        if *title_done.borrow() {
                            return Ok(());
                        }
                        title.borrow_mut().push_str(chunk.as_str());
                        if chunk.last_in_text_node() {
                            *title_done.borrow_mut() = true;
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| ReplyContextError::Document {
        message: err.to_string(),
    })?;

    let canonical = canonical.take().map(|href| decode_entities(&href));
    let title = decode_entities(&title.take())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Ok((canonical, title))
}

/// Decode the character references that show up in titles and attribute
/// values: the five XML entities, `&nbsp;` and numeric references. Anything
/// else is left as written.
fn decode_entities(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let reference = tail
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_reference(&tail[1..end]).map(|ch| (ch, end)));
        match reference {
            Some((ch, end)) => {
                decoded.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = &tail[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_canonical_and_first_title() {
        let html = r#"<html><head>
            <title>
              Fish &amp; Chips &#8212; a   review
            </title>
            <link rel="canonical" href="/posts/1?a=1&amp;b=2">
            </head><body><svg><title>icon</title></svg></body></html>"#;

        let (canonical, title) = scan_document(html).expect("scan");
        assert_eq!(canonical.as_deref(), Some("/posts/1?a=1&b=2"));
        assert_eq!(title, "Fish & Chips \u{2014} a review");
    }

    #[test]
    fn missing_markup_yields_nothing() {
        let (canonical, title) = scan_document("<p>bare</p>").expect("scan");
        assert_eq!(canonical, None);
        assert_eq!(title, "");
    }

    #[test]
    fn unknown_references_are_kept() {
        assert_eq!(decode_entities("a &copy; b & c &#x41;"), "a &copy; b & c A");
        assert_eq!(decode_entities("&#99999999;"), "&#99999999;");
    }

    #[test]
    fn anchor_escapes_title() {
        let context = ReplyContext {
            canonical: Url::parse("https://example.com/a?x=1&y=2").expect("url"),
            title: "<b>Bold</b> & brave".to_string(),
        };
        assert_eq!(
            context.anchor().expect("anchor"),
            "<a class=\"u-in-reply-to\" href=\"https://example.com/a?x=1&amp;y=2\">&lt;b&gt;Bold&lt;/b&gt; &amp; brave</a>"
        );
    }

    #[test]
    fn anchor_falls_back_to_url_text() {
        let context = ReplyContext {
            canonical: Url::parse("https://example.com/").expect("url"),
            title: String::new(),
        };
        assert_eq!(
            context.anchor().expect("anchor"),
            "<a class=\"u-in-reply-to\" href=\"https://example.com/\">https://example.com/</a>"
        );
    }

    #[test]
    fn shared_url_needs_http_scheme() {
        assert!(shared_url(" https://example.com/x ").is_some());
        assert!(shared_url("just some selected text").is_none());
        assert!(shared_url("mailto:me@example.com").is_none());
    }
}
