use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::pagination::OffsetPage;
use crate::application::repos::{CreateEntryParams, EntriesRepo, RepoError, UpdateEntryParams};
use crate::domain::entities::EntryRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: String,
    title: String,
    content: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<EntryRow> for EntryRecord {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl EntriesRepo for PostgresRepositories {
    async fn create_entry(&self, params: CreateEntryParams) -> Result<EntryRecord, RepoError> {
        let CreateEntryParams {
            id,
            title,
            content,
            created_at,
        } = params;

        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            INSERT INTO entries (namespace, id, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, title, content, created_at, updated_at
            "#,
        )
        .bind(self.namespace())
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(created_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_entry(&self, id: &str) -> Result<Option<EntryRecord>, RepoError> {
        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, title, content, created_at, updated_at
            FROM entries
            WHERE namespace = $1 AND id = $2
            "#,
        )
        .bind(self.namespace())
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn update_entry(&self, params: UpdateEntryParams) -> Result<EntryRecord, RepoError> {
        let UpdateEntryParams {
            id,
            title,
            content,
            updated_at,
        } = params;

        // `updated_at` never stands still, even when the clock does.
        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            UPDATE entries
            SET title = $3,
                content = $4,
                updated_at = GREATEST($5, updated_at + INTERVAL '1 microsecond')
            WHERE namespace = $1 AND id = $2
            RETURNING id, title, content, created_at, updated_at
            "#,
        )
        .bind(self.namespace())
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(updated_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn delete_entry(&self, id: &str) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM entries WHERE namespace = $1 AND id = $2")
            .bind(self.namespace())
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_entries(&self, page: OffsetPage) -> Result<Vec<EntryRecord>, RepoError> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, title, content, created_at, updated_at
            FROM entries
            WHERE namespace = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(self.namespace())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
