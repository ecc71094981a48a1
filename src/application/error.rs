use std::error::Error as StdError;

use askama::Error as AskamaError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{entries::EntryError, repos::RepoError, syndication::SyndicationError},
    infra::error::InfraError,
};

/// Diagnostics a handler leaves on its response for the request log.
/// Clients never see it.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    /// Module path of the code that gave up.
    pub source: &'static str,
    /// Outermost error first, then each `source()` beneath it.
    pub chain: Vec<String>,
}

impl ErrorReport {
    pub fn capture(source: &'static str, error: &dyn StdError) -> Self {
        let chain = std::iter::successors(Some(error), |&err| err.source())
            .map(ToString::to_string)
            .collect();
        Self { source, chain }
    }

    pub fn note(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            chain: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Why a public page or the feed could not be served.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Entry(#[from] EntryError),
    #[error(transparent)]
    Feed(#[from] SyndicationError),
    #[error("rendering `{template}` failed")]
    Template {
        template: &'static str,
        #[source]
        error: AskamaError,
    },
}

impl PageError {
    fn entry(&self) -> Option<&EntryError> {
        match self {
            PageError::Entry(err) | PageError::Feed(SyndicationError::Entries(err)) => Some(err),
            PageError::Template { .. } => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.entry() {
            Some(EntryError::NotFound) => StatusCode::NOT_FOUND,
            Some(EntryError::IdCollision { .. }) => StatusCode::CONFLICT,
            Some(EntryError::Storage(RepoError::Timeout)) => StatusCode::SERVICE_UNAVAILABLE,
            Some(EntryError::Storage(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self.entry() {
            Some(EntryError::NotFound) => "Entry not found",
            Some(EntryError::IdCollision { .. }) => "Entry already exists",
            Some(EntryError::Storage(RepoError::Timeout)) => "The stream is busy, try again",
            Some(EntryError::Storage(_)) => "The stream is unavailable",
            None => "Page could not be rendered",
        }
    }

    fn origin(&self) -> &'static str {
        match self {
            PageError::Entry(_) => "application::entries",
            PageError::Feed(_) => "application::syndication",
            PageError::Template { .. } => "presentation::views",
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.public_message()).into_response();
        ErrorReport::capture(self.origin(), &self).attach(&mut response);
        response
    }
}

/// Failures that end the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Entry(#[from] EntryError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_errors_map_to_statuses() {
        assert_eq!(
            PageError::from(EntryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PageError::from(EntryError::IdCollision { id: "x".into() }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PageError::from(EntryError::Storage(RepoError::Timeout)).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PageError::from(SyndicationError::Entries(EntryError::Storage(
                RepoError::from_persistence("gone")
            )))
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn report_carries_the_storage_cause() {
        let response = PageError::from(EntryError::Storage(RepoError::from_persistence(
            "connection reset",
        )))
        .into_response();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.source, "application::entries");
        assert!(report.chain.iter().any(|m| m.contains("connection reset")));
    }

    #[test]
    fn configuration_failures_stay_infrastructure_errors() {
        let err = AppError::from(InfraError::configuration("site.host: missing"));
        assert!(matches!(err, AppError::Infra(InfraError::Configuration { .. })));
        assert_eq!(err.to_string(), "configuration error: site.host: missing");
    }
}
