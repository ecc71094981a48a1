use axum::{
    Router,
    extract::{Path, Query, RawQuery, State},
    http::{
        HeaderValue, StatusCode, Uri,
        header::{CONTENT_TYPE, LOCATION},
    },
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::{
    entries::EntryError,
    error::PageError,
    pagination::{OffsetPage, PageQuery},
    render::render_entry,
};
use crate::presentation::views::{
    EntryTemplate, EntryView, IndexTemplate, PagerView, SiteChrome, render_not_found_response,
    render_template_response,
};

use super::{HttpState, db_health_response};

/// Discovery documents answered by the federation bridge instead of us.
const BRIDGED_WELL_KNOWN: [&str; 4] = [
    "/.well-known/host-meta",
    "/.well-known/host-meta.xrd",
    "/.well-known/host-meta.jrd",
    "/.well-known/webfinger",
];

pub(super) fn routes(state: &HttpState) -> Router<HttpState> {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/entry/{id}", get(entry_detail))
        .route("/feed", get(atom_feed))
        .route("/_health", get(health));

    if state.site.fedsoc_bridge.is_some() {
        for path in BRIDGED_WELL_KNOWN {
            router = router.route(path, get(bridge_redirect));
        }
    }

    router
}

fn chrome(state: &HttpState) -> SiteChrome {
    SiteChrome::new(
        &state.site.title,
        &state.site.author,
        &state.site.links,
        state.site.hub.as_deref(),
    )
}

async fn index(State(state): State<HttpState>, Query(query): Query<PageQuery>) -> Response {
    let limit = query.limit();
    let offset = query.offset();

    let records = match state.entries.list(limit, offset).await {
        Ok(records) => records,
        Err(err) => return PageError::from(err).into_response(),
    };

    let page = OffsetPage::new(limit, offset);
    let older = page.and_then(|page| page.next_offset(records.len()));
    let newer = page
        .filter(|page| page.offset() > 0)
        .map(|page| (page.offset() - page.limit()).max(0));

    let entries = records
        .iter()
        .map(|record| {
            let html = render_entry(state.renderer.as_ref(), &record.content);
            EntryView::new(record, &state.site.links, html)
        })
        .collect();

    render_template_response(
        IndexTemplate {
            chrome: chrome(&state),
            entries,
            pager: PagerView::new(limit, newer, older),
        },
        StatusCode::OK,
    )
}

async fn entry_detail(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    match state.entries.get(&id).await {
        Ok(record) => {
            let html = render_entry(state.renderer.as_ref(), &record.content);
            render_template_response(
                EntryTemplate {
                    chrome: chrome(&state),
                    entry: EntryView::new(&record, &state.site.links, html),
                },
                StatusCode::OK,
            )
        }
        Err(EntryError::NotFound) => render_not_found_response(chrome(&state), &id),
        Err(err) => PageError::from(err).into_response(),
    }
}

async fn atom_feed(State(state): State<HttpState>) -> Response {
    match state.syndication.atom_feed().await {
        Ok(body) => {
            let mut response = body.into_response();
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/atom+xml; charset=utf-8"),
            );
            response
        }
        Err(err) => PageError::from(err).into_response(),
    }
}

/// 302 to the same path on the federation bridge, query string included.
async fn bridge_redirect(
    State(state): State<HttpState>,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    let Some(bridge) = state.site.fedsoc_bridge.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let location = bridge_location(bridge.as_str(), uri.path(), query.as_deref());
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

fn bridge_location(bridge: &str, path: &str, query: Option<&str>) -> String {
    let mut location = format!("{}{path}", bridge.trim_end_matches('/'));
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        location.push('?');
        location.push_str(query);
    }
    location
}

async fn health(State(state): State<HttpState>) -> Response {
    match &state.db {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
