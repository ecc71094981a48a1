//! Entry store service: writes, lookups and listing, followed by the
//! notification phase for writes.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{
    application::{
        notify::{NotificationPipeline, NotificationReport},
        pagination::OffsetPage,
        repos::{CreateEntryParams, EntriesRepo, RepoError, UpdateEntryParams},
    },
    domain::{
        entities::EntryRecord,
        entries::{derive_entry_id, validate_entry_id},
    },
};

const METRIC_WRITES: &str = "streamlog_entries_written_total";

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("entry not found")]
    NotFound,
    #[error("an entry with id `{id}` already exists")]
    IdCollision { id: String },
    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl EntryError {
    fn from_repo(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => EntryError::NotFound,
            other => EntryError::Storage(other),
        }
    }
}

/// Ids that could never have been derived are reported as missing without a
/// storage round trip.
fn known_shape(id: &str) -> Result<(), EntryError> {
    validate_entry_id(id).map_err(|reason| {
        debug!(target: "streamlog::entries", reason = %reason, "rejected entry id");
        EntryError::NotFound
    })
}

/// When the notification phase runs relative to the write that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    /// No notifications after writes.
    Off,
    /// Awaited before the write call returns.
    Inline,
    /// Spawned onto the runtime; the write call returns immediately.
    Background,
}

impl NotifyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NotifyMode::Off => "off",
            NotifyMode::Inline => "inline",
            NotifyMode::Background => "background",
        }
    }
}

#[derive(Clone)]
pub struct EntryService {
    repo: Arc<dyn EntriesRepo>,
    pipeline: Option<NotificationPipeline>,
    mode: NotifyMode,
}

impl EntryService {
    pub fn new(repo: Arc<dyn EntriesRepo>) -> Self {
        Self {
            repo,
            pipeline: None,
            mode: NotifyMode::Off,
        }
    }

    pub fn with_notifications(mut self, pipeline: NotificationPipeline, mode: NotifyMode) -> Self {
        self.pipeline = Some(pipeline);
        self.mode = mode;
        self
    }

    /// How writes made through this service are followed up. `Off` when no
    /// pipeline is attached.
    pub fn notify_mode(&self) -> NotifyMode {
        match self.pipeline {
            Some(_) => self.mode,
            None => NotifyMode::Off,
        }
    }

    /// Store a new entry and return its id.
    pub async fn create(&self, content: &str, title: &str) -> Result<String, EntryError> {
        let now = OffsetDateTime::now_utc();
        let id = derive_entry_id(content, title, now);

        let record = self
            .repo
            .create_entry(CreateEntryParams {
                id: id.clone(),
                title: title.to_string(),
                content: content.to_string(),
                created_at: now,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => EntryError::IdCollision { id: id.clone() },
                other => EntryError::Storage(other),
            })?;

        counter!(METRIC_WRITES, "op" => "create").increment(1);
        info!(target: "streamlog::entries", entry_id = %record.id, "entry created");

        self.after_write(&record).await;
        Ok(record.id)
    }

    pub async fn get(&self, id: &str) -> Result<EntryRecord, EntryError> {
        known_shape(id)?;
        self.repo
            .find_entry(id)
            .await
            .map_err(EntryError::from_repo)?
            .ok_or(EntryError::NotFound)
    }

    /// Replace title and content of an existing entry. `created_at` and the id
    /// are kept; `updated_at` strictly advances.
    pub async fn update(
        &self,
        id: &str,
        content: &str,
        title: &str,
    ) -> Result<EntryRecord, EntryError> {
        known_shape(id)?;

        let record = self
            .repo
            .update_entry(UpdateEntryParams {
                id: id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                updated_at: OffsetDateTime::now_utc(),
            })
            .await
            .map_err(EntryError::from_repo)?;

        counter!(METRIC_WRITES, "op" => "update").increment(1);
        info!(target: "streamlog::entries", entry_id = %record.id, "entry updated");

        self.after_write(&record).await;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<(), EntryError> {
        known_shape(id)?;
        self.repo
            .delete_entry(id)
            .await
            .map_err(EntryError::from_repo)?;

        counter!(METRIC_WRITES, "op" => "delete").increment(1);
        info!(target: "streamlog::entries", entry_id = id, "entry deleted");
        Ok(())
    }

    /// Newest-first window of entries. A non-positive `limit` yields nothing
    /// and a negative `offset` counts as zero.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<EntryRecord>, EntryError> {
        let Some(page) = OffsetPage::new(limit, offset) else {
            return Ok(Vec::new());
        };
        self.list_page(page).await
    }

    pub async fn list_page(&self, page: OffsetPage) -> Result<Vec<EntryRecord>, EntryError> {
        self.repo
            .list_entries(page)
            .await
            .map_err(EntryError::from_repo)
    }

    /// Run the notification phase again for an existing entry, whatever the
    /// configured mode. `Ok(None)` when no pipeline is attached.
    pub async fn resend(&self, id: &str) -> Result<Option<NotificationReport>, EntryError> {
        let record = self.get(id).await?;
        match &self.pipeline {
            Some(pipeline) => Ok(Some(pipeline.run(&record.id, &record.content).await)),
            None => Ok(None),
        }
    }

    async fn after_write(&self, record: &EntryRecord) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        match self.mode {
            NotifyMode::Off => {
                debug!(
                    target: "streamlog::entries",
                    entry_id = %record.id,
                    "notifications disabled"
                );
            }
            NotifyMode::Inline => {
                pipeline.run(&record.id, &record.content).await;
            }
            NotifyMode::Background => {
                let pipeline = pipeline.clone();
                let id = record.id.clone();
                let content = record.content.clone();
                tokio::spawn(async move {
                    pipeline.run(&id, &content).await;
                });
            }
        }
    }
}
