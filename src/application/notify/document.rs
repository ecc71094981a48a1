//! Bounded reads of remote HTML documents.

use reqwest::Response;

/// Most bytes of a remote document that are ever scanned. Endpoint and
/// reply-context markup sits in the head, long before this.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub struct CappedBody {
    pub text: String,
    /// The document was longer than the limit and the rest was not read.
    pub truncated: bool,
}

/// Read at most `limit` bytes of the response body. Stops pulling chunks
/// once the limit is reached; invalid UTF-8 is replaced.
pub async fn read_capped(mut response: Response, limit: usize) -> Result<CappedBody, reqwest::Error> {
    let mut body = Vec::new();
    let mut truncated = false;

    while let Some(chunk) = response.chunk().await? {
        let room = limit.saturating_sub(body.len());
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(CappedBody {
        text: String::from_utf8_lossy(&body).into_owned(),
        truncated,
    })
}
