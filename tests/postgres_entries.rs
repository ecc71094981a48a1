use std::sync::Arc;

use sqlx::PgPool;
use time::macros::datetime;

use streamlog::application::entries::{EntryError, EntryService};
use streamlog::application::pagination::OffsetPage;
use streamlog::application::repos::{
    CreateEntryParams, EntriesRepo, RepoError, UpdateEntryParams,
};
use streamlog::infra::db::PostgresRepositories;

fn create(id: &str, at: time::OffsetDateTime) -> CreateEntryParams {
    CreateEntryParams {
        id: id.to_string(),
        title: format!("title {id}"),
        content: format!("content {id}"),
        created_at: at,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_ids_violate_primary_key(pool: PgPool) {
    let repo = PostgresRepositories::new(pool, "default");
    let at = datetime!(2024-01-01 00:00 UTC);

    repo.create_entry(create("a1", at)).await.expect("first insert");
    let err = repo
        .create_entry(create("a1", at))
        .await
        .expect_err("duplicate insert");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn namespaces_are_isolated(pool: PgPool) {
    let left = PostgresRepositories::new(pool.clone(), "left");
    let right = PostgresRepositories::new(pool, "right");
    let at = datetime!(2024-01-01 00:00 UTC);

    left.create_entry(create("shared", at)).await.expect("left");
    right.create_entry(create("shared", at)).await.expect("right");

    right.delete_entry("shared").await.expect("delete right");
    assert!(left.find_entry("shared").await.expect("find").is_some());
    assert!(right.find_entry("shared").await.expect("find").is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_orders_newest_first_with_offset(pool: PgPool) {
    let repo = PostgresRepositories::new(pool, "default");
    repo.create_entry(create("old", datetime!(2024-01-01 00:00 UTC)))
        .await
        .expect("old");
    repo.create_entry(create("mid", datetime!(2024-02-01 00:00 UTC)))
        .await
        .expect("mid");
    repo.create_entry(create("new", datetime!(2024-03-01 00:00 UTC)))
        .await
        .expect("new");

    let page = OffsetPage::new(2, 1).expect("page");
    let ids: Vec<String> = repo
        .list_entries(page)
        .await
        .expect("list")
        .into_iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, vec!["mid".to_string(), "old".to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_advances_even_with_stale_clock(pool: PgPool) {
    let repo = PostgresRepositories::new(pool, "default");
    let created = datetime!(2024-05-01 12:00 UTC);
    repo.create_entry(create("e1", created)).await.expect("create");

    let updated = repo
        .update_entry(UpdateEntryParams {
            id: "e1".to_string(),
            title: "new".to_string(),
            content: "body".to_string(),
            updated_at: datetime!(2020-01-01 00:00 UTC),
        })
        .await
        .expect("update");

    assert_eq!(updated.created_at, created);
    assert!(updated.updated_at > created);
    assert_eq!(updated.title, "new");

    let missing = repo
        .update_entry(UpdateEntryParams {
            id: "nope".to_string(),
            title: String::new(),
            content: String::new(),
            updated_at: created,
        })
        .await
        .expect_err("missing");
    assert!(matches!(missing, RepoError::NotFound));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn service_round_trip_against_postgres(pool: PgPool) {
    let repo: Arc<dyn EntriesRepo> = Arc::new(PostgresRepositories::new(pool, "default"));
    let entries = EntryService::new(repo);

    let id = entries
        .create("This is content.", "This is title")
        .await
        .expect("create");
    let record = entries.get(&id).await.expect("get");
    assert_eq!(record.created_at, record.updated_at);

    entries.delete(&id).await.expect("delete");
    assert!(matches!(entries.get(&id).await, Err(EntryError::NotFound)));
}
