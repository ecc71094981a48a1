//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

/// A single authored post in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    pub id: String,
    pub title: String,
    /// Raw markdown source as written by the author.
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl EntryRecord {
    /// Whether the entry has been edited since it was first written.
    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }
}
