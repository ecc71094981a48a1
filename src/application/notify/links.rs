use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link discovery failed: {message}")]
    Parse { message: String },
}

impl LinkError {
    fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Collect the distinct absolute http(s) targets of every `a[href]` in `html`,
/// resolving relative references against `source`.
///
/// Fragment-only references and links pointing back at `source` itself are
/// not webmention targets and are dropped. Any fragment on a kept target is
/// stripped before de-duplication.
pub fn discover_links(html: &str, source: &str) -> Result<BTreeSet<Url>, LinkError> {
    let base = Url::parse(source)
        .map_err(|err| LinkError::parse(format!("invalid source url `{source}`: {err}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(LinkError::parse(format!(
            "source url `{source}` is not http(s)"
        )));
    }

    let hrefs = Rc::new(RefCell::new(Vec::<String>::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("a[href]", {
                let hrefs = Rc::clone(&hrefs);
                move |el| {
                    if let Some(href) = el.get_attribute("href") {
                        hrefs.borrow_mut().push(href);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| LinkError::parse(err.to_string()))?;

    let mut self_link = base.clone();
    self_link.set_fragment(None);

    let mut targets = BTreeSet::new();
    for href in hrefs.borrow().iter() {
        let trimmed = href.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Ok(mut target) = base.join(trimmed) else {
            continue;
        };
        if !matches!(target.scheme(), "http" | "https") {
            continue;
        }
        target.set_fragment(None);
        if target == self_link {
            continue;
        }
        targets.insert(target);
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://stream.example/entry/abc";

    fn strings(set: &BTreeSet<Url>) -> Vec<&str> {
        set.iter().map(Url::as_str).collect()
    }

    #[test]
    fn finds_absolute_and_relative_links() {
        let html = r#"<p><a href="https://a.example/post">a</a>
            <a href="/about">about</a>
            <a href="../entry/other">other</a></p>"#;
        let links = discover_links(html, SOURCE).expect("links");
        assert_eq!(
            strings(&links),
            vec![
                "https://a.example/post",
                "https://stream.example/about",
                "https://stream.example/entry/other",
            ]
        );
    }

    #[test]
    fn drops_fragments_self_links_and_other_schemes() {
        let html = r##"<a href="#top">top</a>
            <a href="https://stream.example/entry/abc#comments">self</a>
            <a href="mailto:me@example.com">mail</a>
            <a href="">empty</a>
            <a name="anchor">no href</a>"##;
        let links = discover_links(html, SOURCE).expect("links");
        assert!(links.is_empty());
    }

    #[test]
    fn duplicates_collapse() {
        let html = r#"<a href="https://a.example/x">1</a><a href="https://a.example/x#frag">2</a>"#;
        let links = discover_links(html, SOURCE).expect("links");
        assert_eq!(strings(&links), vec!["https://a.example/x"]);
    }

    #[test]
    fn rejects_relative_source() {
        let err = discover_links("<a href='/x'>x</a>", "/entry/abc").expect_err("relative source");
        assert!(matches!(err, LinkError::Parse { .. }));
    }

    #[test]
    fn empty_document_has_no_links() {
        let links = discover_links("", SOURCE).expect("links");
        assert!(links.is_empty());
    }
}
