mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quire::domain::drafts::{Draft, DraftEdit, NEW_DRAFT_ID};
use quire::editor::client::DEFAULT_REQUEST_TIMEOUT;
use quire::editor::{
    AdminApiClient, AdminCredentials, AutosaveCoordinator, AutosavePolicy, AutosaveSession,
    DraftStore, FsDraftStore, PublishClient, RemoteSaveClient, SaveStatus,
};
use quire_api_types::ArticleView;
use tempfile::TempDir;
use tokio::net::TcpListener;

use support::{TOKEN, app_with, settings};

async fn spawn_server() -> String {
    let router = app_with(settings()).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("serve");
    });
    format!("http://{addr}")
}

fn quick_policy() -> AutosavePolicy {
    AutosavePolicy {
        local_delay: Duration::from_millis(20),
        remote_interval: Duration::from_millis(60),
        remote_cap: Duration::from_millis(100),
        retry_base: Duration::from_millis(20),
        max_failures: 3,
    }
}

fn api(site: &str, token: Option<&str>) -> AdminApiClient {
    AdminApiClient::new(
        site,
        AdminCredentials::new(token.map(str::to_string)),
        DEFAULT_REQUEST_TIMEOUT,
    )
    .expect("api client")
}

async fn wait_until(session: &AutosaveSession, done: impl Fn(&SaveStatus) -> bool) {
    let mut rx = session.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let reached = done(&rx.borrow_and_update());
            if reached {
                return;
            }
            rx.changed().await.expect("session alive");
        }
    })
    .await
    .expect("status reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_draft_autosaves_rekeys_and_publishes() {
    let site = spawn_server().await;
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(FsDraftStore::open(dir.path()).await.expect("store"));
    let api = api(&site, Some(TOKEN));
    let coordinator = AutosaveCoordinator::new(
        store.clone(),
        Arc::new(RemoteSaveClient::new(api.clone())),
    )
    .with_policy(quick_policy());

    let session = coordinator.open(Draft::new_local());
    session.on_edit(DraftEdit {
        title: "Field Notes".into(),
        content: "First paragraph".into(),
        section_id: None,
    });
    wait_until(&session, |status| {
        status.is_clean() && status.last_remote_save.is_some()
    })
    .await;

    let article_id = session.id();
    assert_ne!(article_id, NEW_DRAFT_ID);
    assert_eq!(session.draft().remote_id.as_deref(), Some(article_id.as_str()));

    // The rekey lands under the local gate right after the remote save.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(store.load(NEW_DRAFT_ID).await.expect("load").is_none());
    let stored = store.load(&article_id).await.expect("load").expect("rekeyed");
    assert_eq!(stored.title, "Field Notes");

    session.on_edit(DraftEdit {
        title: "Field Notes".into(),
        content: "Second draft of the paragraph".into(),
        section_id: None,
    });
    let saved = session.force_remote_save().await.expect("update");
    assert!(!saved.created);
    assert_eq!(saved.remote_id, article_id);
    session.cancel_pending();

    let published = PublishClient::new(api)
        .publish(&article_id, None)
        .await
        .expect("publish");
    assert_eq!(published.status, "published");

    let public: ArticleView = reqwest::get(format!("{site}/api/articles/{}", published.slug))
        .await
        .expect("public get")
        .json()
        .await
        .expect("article json");
    assert_eq!(public.content, "Second draft of the paragraph");
    assert_eq!(public.section.slug, "general");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_token_surfaces_sync_issue_and_keeps_local_copy() {
    let site = spawn_server().await;
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(FsDraftStore::open(dir.path()).await.expect("store"));
    let coordinator = AutosaveCoordinator::new(
        store.clone(),
        Arc::new(RemoteSaveClient::new(api(&site, Some("wrong-token")))),
    )
    .with_policy(quick_policy());

    let session = coordinator.open(Draft::new_local());
    session.on_edit(DraftEdit {
        title: "Offline".into(),
        content: "Still here".into(),
        section_id: None,
    });
    wait_until(&session, |status| {
        status.sync_issue.is_some() && status.last_local_save.is_some()
    })
    .await;

    assert_eq!(session.id(), NEW_DRAFT_ID);
    let stored = store.load(NEW_DRAFT_ID).await.expect("load").expect("local copy");
    assert_eq!(stored.content, "Still here");
    assert!(stored.remote_id.is_none());
}
