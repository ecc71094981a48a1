mod admin;
mod middleware;
mod public;

pub use admin::AdminToken;

use std::sync::Arc;

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
};
use sqlx::Error as SqlxError;
use url::Url;

use crate::application::{
    entries::EntryService, error::ErrorReport, notify::SiteLinks, render::ContentRenderer,
    reply::ReplyContextFetcher, syndication::SyndicationService,
};
use crate::infra::db::PostgresRepositories;

use self::middleware::trace_requests;

/// Site identity shown on public pages.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub title: String,
    pub author: String,
    pub links: SiteLinks,
    pub hub: Option<String>,
    /// Federation bridge that answers host-meta and webfinger for us.
    pub fedsoc_bridge: Option<Url>,
}

#[derive(Clone)]
pub struct HttpState {
    pub entries: Arc<EntryService>,
    pub syndication: Arc<SyndicationService>,
    pub renderer: Arc<dyn ContentRenderer>,
    pub replies: Arc<ReplyContextFetcher>,
    pub site: Arc<SiteInfo>,
    pub admin_token: Arc<AdminToken>,
    /// Present when entries live in Postgres; checked by `/_health`.
    pub db: Option<Arc<PostgresRepositories>>,
}

/// Public pages, the feed and the admin API behind one router.
pub fn build_router(state: HttpState) -> Router {
    public::routes(&state)
        .nest("/admin/api", admin::routes(state.clone()))
        .with_state(state)
        .layer(axum_middleware::from_fn(trace_requests))
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::capture("infra::http::db_health", &err).attach(&mut response);
            response
        }
    }
}
