//! Process-local entry store used when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::pagination::OffsetPage;
use crate::application::repos::{CreateEntryParams, EntriesRepo, RepoError, UpdateEntryParams};
use crate::domain::entities::EntryRecord;
use crate::domain::entries::next_updated_at;

#[derive(Default)]
struct State {
    entries: HashMap<String, Stored>,
    next_seq: u64,
}

struct Stored {
    record: EntryRecord,
    /// Insertion counter; breaks ties on `created_at`.
    seq: u64,
}

/// Entries kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryEntries {
    state: RwLock<State>,
}

impl InMemoryEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EntriesRepo for InMemoryEntries {
    async fn create_entry(&self, params: CreateEntryParams) -> Result<EntryRecord, RepoError> {
        let mut state = self.state.write().await;
        if state.entries.contains_key(&params.id) {
            return Err(RepoError::Duplicate {
                constraint: "entries_pkey".to_string(),
            });
        }

        let record = EntryRecord {
            id: params.id,
            title: params.title,
            content: params.content,
            created_at: params.created_at,
            updated_at: params.created_at,
        };
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            record.id.clone(),
            Stored {
                record: record.clone(),
                seq,
            },
        );
        Ok(record)
    }

    async fn find_entry(&self, id: &str) -> Result<Option<EntryRecord>, RepoError> {
        let state = self.state.read().await;
        Ok(state.entries.get(id).map(|stored| stored.record.clone()))
    }

    async fn update_entry(&self, params: UpdateEntryParams) -> Result<EntryRecord, RepoError> {
        let mut state = self.state.write().await;
        let stored = state
            .entries
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;

        stored.record.title = params.title;
        stored.record.content = params.content;
        stored.record.updated_at = next_updated_at(stored.record.updated_at, params.updated_at);
        Ok(stored.record.clone())
    }

    async fn delete_entry(&self, id: &str) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state
            .entries
            .remove(id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn list_entries(&self, page: OffsetPage) -> Result<Vec<EntryRecord>, RepoError> {
        let state = self.state.read().await;
        let mut stored: Vec<&Stored> = state.entries.values().collect();
        stored.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });

        Ok(stored
            .into_iter()
            .skip(page.offset_usize())
            .take(page.limit_usize())
            .map(|stored| stored.record.clone())
            .collect())
    }
}
