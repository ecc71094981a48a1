//! Postgres-backed repository implementations.

mod entries;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};

/// Postgres adapters. Every query is scoped to `namespace`, so several
/// independent streams can share one database.
#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
    namespace: Arc<str>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool, namespace: impl Into<Arc<str>>) -> Self {
        Self {
            pool: Arc::new(pool),
            namespace: namespace.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}
