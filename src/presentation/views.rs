//! Askama views for the public pages. Entries are marked up as
//! microformats2 `h-entry` so receivers of our webmentions can parse them.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::application::{
    error::{ErrorReport, PageError},
    notify::SiteLinks,
};
use crate::domain::entities::EntryRecord;

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, PageError> {
    template
        .render()
        .map(Html)
        .map_err(|error| PageError::Template {
            template: std::any::type_name::<T>(),
            error,
        })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// The 404 page for a permalink that names no entry.
pub fn render_not_found_response(chrome: SiteChrome, id: &str) -> Response {
    let mut response =
        render_template_response(NotFoundTemplate { chrome }, StatusCode::NOT_FOUND);
    ErrorReport::note(
        "presentation::views::render_not_found_response",
        format!("no entry `{id}`"),
    )
    .attach(&mut response);
    response
}

/// Site-wide values every page needs.
#[derive(Clone)]
pub struct SiteChrome {
    pub title: String,
    pub author: Option<String>,
    pub home: String,
    pub feed_url: String,
    pub hub: Option<String>,
}

impl SiteChrome {
    pub fn new(title: &str, author: &str, links: &SiteLinks, hub: Option<&str>) -> Self {
        let author = author.trim();
        Self {
            title: title.to_string(),
            author: (!author.is_empty()).then(|| author.to_string()),
            home: format!("{}/", links.host()),
            feed_url: links.feed_url(),
            hub: hub.map(str::to_string),
        }
    }
}

/// One entry with its content already rendered and sanitised.
#[derive(Clone)]
pub struct EntryView {
    pub permalink: String,
    pub title: String,
    pub html: String,
    pub published: String,
    /// Present once the entry has been edited.
    pub updated: Option<String>,
}

impl EntryView {
    pub fn new(record: &EntryRecord, links: &SiteLinks, html: String) -> Self {
        Self {
            permalink: links.permalink(&record.id),
            title: record.title.clone(),
            html,
            published: timestamp(record.created_at),
            updated: record.is_edited().then(|| timestamp(record.updated_at)),
        }
    }
}

fn timestamp(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}

/// Links to the neighbouring index windows.
#[derive(Clone, Default)]
pub struct PagerView {
    pub newer: Option<String>,
    pub older: Option<String>,
}

impl PagerView {
    pub fn new(limit: i64, newer_offset: Option<i64>, older_offset: Option<i64>) -> Self {
        let href = |offset: i64| format!("/?limit={limit}&offset={offset}");
        Self {
            newer: newer_offset.map(href),
            older: older_offset.map(href),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.newer.is_none() && self.older.is_none()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub chrome: SiteChrome,
    pub entries: Vec<EntryView>,
    pub pager: PagerView,
}

#[derive(Template)]
#[template(path = "entry.html")]
pub struct EntryTemplate {
    pub chrome: SiteChrome,
    pub entry: EntryView,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub chrome: SiteChrome,
}
