//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::OffsetPage;
use crate::domain::entities::EntryRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateEntryParams {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Written to both `created_at` and `updated_at`.
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateEntryParams {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Wall-clock time of the edit. Adapters store
    /// [`next_updated_at`](crate::domain::entries::next_updated_at) of it.
    pub updated_at: OffsetDateTime,
}

/// Persistence of entries. Implementations scope every operation to their own
/// record set (storage namespace).
#[async_trait]
pub trait EntriesRepo: Send + Sync {
    /// Insert a new entry. Fails with [`RepoError::Duplicate`] when the id is taken.
    async fn create_entry(&self, params: CreateEntryParams) -> Result<EntryRecord, RepoError>;

    async fn find_entry(&self, id: &str) -> Result<Option<EntryRecord>, RepoError>;

    /// Overwrite title and content. Fails with [`RepoError::NotFound`] when absent.
    async fn update_entry(&self, params: UpdateEntryParams) -> Result<EntryRecord, RepoError>;

    /// Remove an entry permanently. Fails with [`RepoError::NotFound`] when absent.
    async fn delete_entry(&self, id: &str) -> Result<(), RepoError>;

    /// Entries ordered by `created_at` descending, newest insert first on ties.
    async fn list_entries(&self, page: OffsetPage) -> Result<Vec<EntryRecord>, RepoError>;
}
