//! Token-protected JSON API for authoring entries.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, Request, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use url::Url;

use crate::application::{
    entries::{EntryError, NotifyMode},
    error::ErrorReport,
    pagination::{OffsetPage, PageQuery},
    reply::{EntryDraft, ReplyContextError},
};
use crate::domain::entities::EntryRecord;

use super::HttpState;
use super::middleware::EntryWrite;

mod codes {
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const REPO: &str = "repo_error";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const REPLY_CONTEXT: &str = "reply_context";
}

/// The configured admin bearer token, kept only as a SHA-256 digest.
pub struct AdminToken {
    digest: Option<Vec<u8>>,
}

impl AdminToken {
    /// `None` (or an empty token) locks the admin API entirely.
    pub fn new(token: Option<&str>) -> Self {
        let digest = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(hash_token);
        Self { digest }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    pub fn verify(&self, presented: &str) -> bool {
        match &self.digest {
            Some(expected) => expected.ct_eq(&hash_token(presented)).unwrap_u8() == 1,
            None => false,
        }
    }
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn extract_token(header: Option<&HeaderValue>) -> Option<&str> {
    let raw = header?.to_str().ok()?;
    raw.strip_prefix("Bearer ")
}

#[derive(Debug, Serialize)]
struct AdminErrorBody {
    error: AdminErrorMessage,
}

#[derive(Debug, Serialize)]
struct AdminErrorMessage {
    code: &'static str,
    message: &'static str,
}

#[derive(Debug)]
struct AdminError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    detail: String,
}

impl AdminError {
    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: codes::UNAUTHORIZED,
            message: "Admin token required",
            detail: "missing or invalid bearer token".to_string(),
        }
    }

    fn invalid_input(message: &'static str, detail: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: codes::INVALID_INPUT,
            message,
            detail,
        }
    }
}

impl From<ReplyContextError> for AdminError {
    fn from(err: ReplyContextError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: codes::REPLY_CONTEXT,
            message: "Reply context could not be built",
            detail: err.to_string(),
        }
    }
}

impl From<EntryError> for AdminError {
    fn from(err: EntryError) -> Self {
        let (status, code, message) = match &err {
            EntryError::NotFound => (StatusCode::NOT_FOUND, codes::NOT_FOUND, "Entry not found"),
            EntryError::IdCollision { .. } => {
                (StatusCode::CONFLICT, codes::DUPLICATE, "Entry already exists")
            }
            EntryError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::REPO,
                "Storage failure",
            ),
        };
        Self {
            status,
            code,
            message,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let body = AdminErrorBody {
            error: AdminErrorMessage {
                code: self.code,
                message: self.message,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        ErrorReport::note("infra::http::admin", format!("{}: {}", self.code, self.detail))
            .attach(&mut response);
        response
    }
}

async fn require_admin(
    State(state): State<HttpState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = extract_token(request.headers().get(AUTHORIZATION))
        .is_some_and(|token| state.admin_token.verify(token));
    if !authorized {
        return AdminError::unauthorized().into_response();
    }
    next.run(request).await
}

pub(super) fn routes(state: HttpState) -> Router<HttpState> {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route("/share", get(share_draft))
        .route(
            "/entries/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

#[derive(Debug, Deserialize)]
struct EntryInput {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    /// Page this entry replies to; its reply anchor is put before `content`.
    #[serde(default)]
    in_reply_to: Option<String>,
}

/// Web Share Target parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShareQuery {
    title: String,
    text: String,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntryList {
    items: Vec<EntryRecord>,
    next_offset: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CreatedEntry {
    id: String,
    permalink: String,
}

async fn list_entries(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<EntryList>, AdminError> {
    let limit = query.limit();
    let offset = query.offset();
    let items = state.entries.list(limit, offset).await?;
    let next_offset = OffsetPage::new(limit, offset).and_then(|page| page.next_offset(items.len()));
    Ok(Json(EntryList { items, next_offset }))
}

fn with_write(mut response: Response, id: String, op: &'static str, notify: NotifyMode) -> Response {
    response
        .extensions_mut()
        .insert(EntryWrite { id, op, notify });
    response
}

async fn create_entry(
    State(state): State<HttpState>,
    Json(input): Json<EntryInput>,
) -> Result<Response, AdminError> {
    let content = match input.in_reply_to.as_deref() {
        Some(raw) => {
            let target = Url::parse(raw.trim())
                .ok()
                .filter(|url| matches!(url.scheme(), "http" | "https"))
                .ok_or_else(|| {
                    AdminError::invalid_input(
                        "in_reply_to must be an absolute http(s) url",
                        format!("in_reply_to `{raw}`"),
                    )
                })?;
            let anchor = state.replies.reply_anchor(&target).await?;
            if input.content.trim().is_empty() {
                anchor
            } else {
                format!("{anchor}\n\n{}", input.content)
            }
        }
        None => input.content,
    };

    let id = state.entries.create(&content, &input.title).await?;
    let permalink = state.site.links.permalink(&id);
    let response = (
        StatusCode::CREATED,
        Json(CreatedEntry {
            id: id.clone(),
            permalink,
        }),
    )
        .into_response();
    Ok(with_write(response, id, "create", state.entries.notify_mode()))
}

async fn share_draft(
    State(state): State<HttpState>,
    Query(query): Query<ShareQuery>,
) -> Json<EntryDraft> {
    Json(
        state
            .replies
            .share_draft(&query.title, &query.text, query.url.as_deref())
            .await,
    )
}

async fn get_entry(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Json<EntryRecord>, AdminError> {
    Ok(Json(state.entries.get(&id).await?))
}

async fn update_entry(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    Json(input): Json<EntryInput>,
) -> Result<Response, AdminError> {
    let record = state
        .entries
        .update(&id, &input.content, &input.title)
        .await?;
    let id = record.id.clone();
    Ok(with_write(
        Json(record).into_response(),
        id,
        "update",
        state.entries.notify_mode(),
    ))
}

async fn delete_entry(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, AdminError> {
    state.entries.delete(&id).await?;
    Ok(with_write(
        StatusCode::NO_CONTENT.into_response(),
        id,
        "delete",
        NotifyMode::Off,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_verification() {
        let token = AdminToken::new(Some("s3cret"));
        assert!(token.is_configured());
        assert!(token.verify("s3cret"));
        assert!(!token.verify("s3cre"));
        assert!(!token.verify(""));
    }

    #[test]
    fn missing_or_blank_token_rejects_everything() {
        for token in [AdminToken::new(None), AdminToken::new(Some("  "))] {
            assert!(!token.is_configured());
            assert!(!token.verify(""));
            assert!(!token.verify("anything"));
        }
    }

    #[test]
    fn bearer_prefix_is_required() {
        let value = HeaderValue::from_static("Bearer abc");
        assert_eq!(extract_token(Some(&value)), Some("abc"));
        let value = HeaderValue::from_static("Basic abc");
        assert_eq!(extract_token(Some(&value)), None);
        assert_eq!(extract_token(None), None);
    }
}
