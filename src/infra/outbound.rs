//! Shared HTTP client for webmention and WebSub traffic.

use std::time::Duration;

use reqwest::{Client, redirect};

use super::error::InfraError;

const MAX_REDIRECTS: usize = 10;

pub fn user_agent() -> &'static str {
    concat!("streamlog/", env!("CARGO_PKG_VERSION"))
}

/// Build the client used for every outbound notification call. `timeout`
/// bounds each request from connect to the end of the body.
pub fn build_client(timeout: Duration) -> Result<Client, InfraError> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(timeout)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|err| InfraError::http_client(err.to_string()))
}
