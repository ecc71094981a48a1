use std::time::Duration;

use httpmock::MockServer;
use url::Url;

use streamlog::application::reply::{EntryDraft, ReplyContextError, ReplyContextFetcher};
use streamlog::infra::outbound;

fn fetcher() -> ReplyContextFetcher {
    ReplyContextFetcher::new(outbound::build_client(Duration::from_secs(5)).expect("http client"))
}

fn url(server: &MockServer, path: &str) -> Url {
    Url::parse(&server.url(path)).expect("mock url")
}

#[tokio::test]
async fn canonical_link_and_title_build_the_anchor() {
    let server = MockServer::start_async().await;
    let page = server
        .mock_async(|when, then| {
            when.method("GET").path("/status/1");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(
                    r#"<html><head><title>Someone on Social: "hello &amp; welcome"</title>
                    <link rel="canonical" href="/canonical/1"></head><body></body></html>"#,
                );
        })
        .await;

    let context = fetcher()
        .fetch(&url(&server, "/status/1"))
        .await
        .expect("context");

    assert_eq!(context.canonical.as_str(), server.url("/canonical/1"));
    assert_eq!(context.title, "Someone on Social: \"hello & welcome\"");
    let anchor = context.anchor().expect("anchor");
    assert!(anchor.starts_with(&format!(
        "<a class=\"u-in-reply-to\" href=\"{}\">",
        server.url("/canonical/1")
    )));
    assert!(anchor.contains("hello &amp; welcome"));
    assert!(!anchor.contains("\"hello"));
    page.assert_async().await;
}

#[tokio::test]
async fn page_without_canonical_uses_the_fetched_url() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/plain");
            then.status(200)
                .header("content-type", "text/html")
                .body("<title>Plain</title>");
        })
        .await;

    let context = fetcher()
        .fetch(&url(&server, "/plain"))
        .await
        .expect("context");
    assert_eq!(context.canonical.as_str(), server.url("/plain"));
    assert_eq!(context.title, "Plain");
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/gone");
            then.status(410);
        })
        .await;

    let err = fetcher()
        .fetch(&url(&server, "/gone"))
        .await
        .expect_err("gone");
    assert!(matches!(err, ReplyContextError::Status { status: 410, .. }));
}

#[tokio::test]
async fn shared_url_in_text_becomes_a_reply_draft() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/post");
            then.status(200)
                .header("content-type", "text/html")
                .body("<head><title>A post</title></head>");
        })
        .await;

    let draft = fetcher()
        .share_draft("Shared title", &server.url("/post"), None)
        .await;

    assert_eq!(
        draft,
        EntryDraft {
            title: "A post".to_string(),
            content: format!(
                "<a class=\"u-in-reply-to\" href=\"{}\">A post</a>",
                server.url("/post")
            ),
        }
    );
}

#[tokio::test]
async fn url_parameter_is_used_when_text_is_not_a_url() {
    let server = MockServer::start_async().await;
    let page = server
        .mock_async(|when, then| {
            when.method("GET").path("/article");
            then.status(200)
                .header("content-type", "text/html")
                .body("<title>Article</title>");
        })
        .await;

    let draft = fetcher()
        .share_draft("", "some selected words", Some(&server.url("/article")))
        .await;

    assert_eq!(draft.title, "Article");
    assert!(draft.content.contains("u-in-reply-to"));
    page.assert_async().await;
}

#[tokio::test]
async fn unreachable_share_keeps_the_shared_fields() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/broken");
            then.status(500);
        })
        .await;

    let draft = fetcher()
        .share_draft("Kept title", &server.url("/broken"), None)
        .await;
    assert_eq!(draft.title, "Kept title");
    assert_eq!(draft.content, server.url("/broken"));

    let draft = fetcher().share_draft("Just text", "no url here", None).await;
    assert_eq!(draft.title, "Just text");
    assert_eq!(draft.content, "no url here");
}

#[tokio::test]
async fn failed_fetch_still_yields_an_anchor_to_the_url() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/down");
            then.status(503);
        })
        .await;

    let target = url(&server, "/down");
    let anchor = fetcher().reply_anchor(&target).await.expect("anchor");
    assert_eq!(
        anchor,
        format!("<a class=\"u-in-reply-to\" href=\"{target}\">{target}</a>")
    );
}
