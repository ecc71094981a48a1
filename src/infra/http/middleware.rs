//! One log line per request, keyed by the entry it touched.

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::{entries::NotifyMode, error::ErrorReport};

pub(super) const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Left on the response by admin handlers that wrote an entry.
#[derive(Debug, Clone)]
pub(super) struct EntryWrite {
    pub id: String,
    pub op: &'static str,
    /// How the notification phase for this write was scheduled.
    pub notify: NotifyMode,
}

pub(super) async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let routed_id = entry_id_from_path(&path).map(str::to_owned);
    let started = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let write = response.extensions_mut().remove::<EntryWrite>();
    let report = response.extensions_mut().remove::<ErrorReport>();

    match (write, report) {
        (Some(write), _) => info!(
            target: "streamlog::http",
            request_id = %request_id,
            method = %method,
            status,
            entry_id = %write.id,
            op = write.op,
            notifications = write.notify.as_str(),
            elapsed_ms,
            "entry written"
        ),
        (None, report) if response.status().is_server_error() => error!(
            target: "streamlog::http",
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            entry_id = routed_id.as_deref(),
            source = report.as_ref().map(|report| report.source),
            chain = ?report.as_ref().map(|report| &report.chain),
            elapsed_ms,
            "request failed"
        ),
        (None, report) if response.status().is_client_error() => warn!(
            target: "streamlog::http",
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            entry_id = routed_id.as_deref(),
            detail = report.as_ref().and_then(|report| report.chain.first()).map(String::as_str),
            elapsed_ms,
            "request rejected"
        ),
        (None, _) => debug!(
            target: "streamlog::http",
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            entry_id = routed_id.as_deref(),
            elapsed_ms,
            "request served"
        ),
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// The `{id}` segment of a permalink or admin entry route.
fn entry_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix("/entry/")
        .or_else(|| path.strip_prefix("/admin/api/entries/"))
        .filter(|id| !id.is_empty() && !id.contains('/'))
}
