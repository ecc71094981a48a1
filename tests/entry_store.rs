use std::sync::Arc;

use streamlog::application::entries::{EntryError, EntryService};
use streamlog::application::repos::EntriesRepo;
use streamlog::infra::memory::InMemoryEntries;

fn service() -> EntryService {
    let repo: Arc<dyn EntriesRepo> = Arc::new(InMemoryEntries::new());
    EntryService::new(repo)
}

#[tokio::test]
async fn create_then_get_round_trips_fields() {
    let entries = service();

    let id = entries
        .create("This is content.", "This is title")
        .await
        .expect("create");
    assert!(!id.is_empty());

    let record = entries.get(&id).await.expect("get");
    assert_eq!(record.id, id);
    assert_eq!(record.content, "This is content.");
    assert_eq!(record.title, "This is title");
    assert_eq!(record.created_at, record.updated_at);
    assert!(!record.is_edited());
}

#[tokio::test]
async fn identical_writes_get_distinct_ids() {
    let entries = service();

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(entries.create("same", "same").await.expect("create"));
    }

    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn listing_scenario_follows_newest_first_order() {
    let entries = service();

    assert!(entries.list(10, 0).await.expect("list").is_empty());

    let a = entries
        .create("This is content.", "This is title")
        .await
        .expect("create a");
    let ids = |records: Vec<streamlog::domain::entities::EntryRecord>| {
        records.into_iter().map(|r| r.id).collect::<Vec<_>>()
    };
    assert_eq!(ids(entries.list(10, 0).await.expect("list")), vec![a.clone()]);

    let b = entries
        .create("Another body.", "Another title")
        .await
        .expect("create b");
    assert_eq!(
        ids(entries.list(10, 0).await.expect("list")),
        vec![b.clone(), a.clone()]
    );
    assert_eq!(ids(entries.list(1, 0).await.expect("list")), vec![b.clone()]);
    assert_eq!(ids(entries.list(10, 1).await.expect("list")), vec![a.clone()]);

    entries.delete(&a).await.expect("delete a");
    assert_eq!(ids(entries.list(10, 0).await.expect("list")), vec![b]);
}

#[tokio::test]
async fn offset_window_matches_prefix_skip() {
    let entries = service();
    for n in 0..7 {
        entries
            .create(&format!("body {n}"), &format!("title {n}"))
            .await
            .expect("create");
    }

    let full = entries.list(5, 0).await.expect("list");
    let window = entries.list(3, 2).await.expect("list");
    assert_eq!(window, full[2..].to_vec());

    let all = entries.list(100, 0).await.expect("list");
    assert_eq!(all.len(), 7);
    assert!(
        all.windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );
}

#[tokio::test]
async fn non_positive_limit_lists_nothing() {
    let entries = service();
    entries.create("x", "y").await.expect("create");

    assert!(entries.list(0, 0).await.expect("list").is_empty());
    assert!(entries.list(-3, 0).await.expect("list").is_empty());
    assert_eq!(entries.list(10, -4).await.expect("list").len(), 1);
}

#[tokio::test]
async fn update_keeps_created_and_advances_updated() {
    let entries = service();
    let id = entries.create("before", "old").await.expect("create");
    let original = entries.get(&id).await.expect("get");

    let updated = entries.update(&id, "after", "new").await.expect("update");
    assert_eq!(updated.id, id);
    assert_eq!(updated.created_at, original.created_at);
    assert!(updated.updated_at > original.updated_at);

    let fetched = entries.get(&id).await.expect("get");
    assert_eq!(fetched.content, "after");
    assert_eq!(fetched.title, "new");
    assert!(fetched.is_edited());

    let again = entries.update(&id, "after", "new").await.expect("update");
    assert!(again.updated_at > updated.updated_at);
}

#[tokio::test]
async fn delete_removes_entry_everywhere() {
    let entries = service();
    let id = entries.create("gone", "soon").await.expect("create");

    entries.delete(&id).await.expect("delete");

    assert!(matches!(entries.get(&id).await, Err(EntryError::NotFound)));
    assert!(
        entries
            .list(10, 0)
            .await
            .expect("list")
            .iter()
            .all(|record| record.id != id)
    );
    assert!(matches!(entries.delete(&id).await, Err(EntryError::NotFound)));
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let entries = service();

    for id in ["0123456789abcdef0123456789abcdef", "", "../etc/passwd"] {
        assert!(matches!(entries.get(id).await, Err(EntryError::NotFound)));
        assert!(matches!(
            entries.update(id, "c", "t").await,
            Err(EntryError::NotFound)
        ));
        assert!(matches!(entries.delete(id).await, Err(EntryError::NotFound)));
    }
}

#[tokio::test]
async fn resend_without_pipeline_reports_nothing() {
    let entries = service();
    let id = entries.create("quiet", "entry").await.expect("create");

    assert!(entries.resend(&id).await.expect("resend").is_none());
    assert!(matches!(
        entries.resend("ffffffffffffffffffffffffffffffff").await,
        Err(EntryError::NotFound)
    ));
}
