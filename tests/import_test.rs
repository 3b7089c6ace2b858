//! Integration tests for share and local imports.

mod common;

use assert_matches::assert_matches;
use common::{TestHarness, GATEWAY_PORT, LOCAL_PORT};
use sharestream::import::ImportEvent;
use sharestream::share::memory::Closed;
use sharestream::share::MemoryShareConnector;

fn library() -> MemoryShareConnector {
    MemoryShareConnector::new()
        .with_file("Media", "Shows/Foo/Season 1/Foo.S01E02.mkv", vec![2])
        .with_file("Media", "Shows/Foo/Season 1/Foo.S01E01.mkv", vec![1])
        .with_file("Media", "Shows/Foo/Season 1/notes.txt", vec![0])
        .with_file("Media", "Movies/Saga/[2] B.mkv", vec![4])
        .with_file("Media", "Movies/Saga/[1] A.mkv", vec![3])
        .with_file("Media", "$RECYCLE.BIN/x.mkv", vec![9])
}

async fn collect(mut handle: sharestream::import::ImportHandle) -> Vec<ImportEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn share_import_builds_playlists_once() {
    let h = TestHarness::new(library());
    let id = h.save_server("nas.local");
    let importer = h.share_importer();

    let added = importer
        .start(id.clone(), vec!["Media".into()])
        .finish(|_| {})
        .await
        .unwrap();
    assert_eq!(added, 2);

    let mut names: Vec<String> = h
        .repository
        .list()
        .into_iter()
        .map(|p| p.file_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["foo_s01.json", "saga_saga.json"]);

    let series = h.repository.get("foo_s01.json").unwrap().unwrap();
    let titles: Vec<&str> = series.videos.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, vec!["Foo S01E01", "Foo S01E02"]);
    assert_eq!(
        series.videos[0].playable_url,
        format!(
            "http://127.0.0.1:{GATEWAY_PORT}/share/{id}/Media/Shows/Foo/Season%201/Foo.S01E01.mkv"
        )
    );

    let saga = h.repository.get("saga_saga.json").unwrap().unwrap();
    assert_eq!(saga.videos[0].title, "A");
    assert_eq!(saga.videos[1].title, "B");

    // The walk released its handles and remembered the share.
    assert_eq!(
        h.connector.closed(),
        vec![Closed::Share, Closed::Session, Closed::Transport]
    );
    assert_eq!(
        h.vault.get_last_share(Some(&id)).unwrap().as_deref(),
        Some("Media")
    );

    // Same names again: nothing new.
    let events = collect(importer.start(id, Vec::new())).await;
    assert_eq!(events.last(), Some(&ImportEvent::Done(0)));
}

#[tokio::test]
async fn share_import_without_credentials_fails() {
    let h = TestHarness::new(library());
    let id = sharestream_common::ServerEndpoint::new("other.local", 445).server_id();

    let events = collect(h.share_importer().start(id, vec!["Media".into()])).await;
    assert_matches!(events.last(), Some(ImportEvent::Error(message)) if message.contains("No saved credentials"));
    assert_eq!(h.connector.connects(), 0);
}

#[tokio::test]
async fn share_import_without_videos_reports_error() {
    let h = TestHarness::new(MemoryShareConnector::new().with_file("Docs", "a.txt", vec![1]));
    let id = h.save_server("nas.local");

    let events = collect(h.share_importer().start(id, vec!["Docs".into()])).await;
    assert_matches!(events.last(), Some(ImportEvent::Error(message)) if message.contains("No video files found"));
    assert!(h.repository.list().is_empty());
}

#[tokio::test]
async fn share_import_skips_missing_share_and_continues() {
    let h = TestHarness::new(library().with_unreadable_dir("Media", "Movies"));
    let id = h.save_server("nas.local");

    let events = collect(h.share_importer().start(id, vec!["Gone".into(), "Media".into()])).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, ImportEvent::Progress(m) if m.contains("Gone"))));
    assert_eq!(events.last(), Some(&ImportEvent::Done(1)));
    assert!(h.repository.exists("foo_s01.json").unwrap());
    assert!(!h.repository.exists("saga_saga.json").unwrap());
}

#[tokio::test]
async fn share_import_without_share_and_no_history_fails() {
    let h = TestHarness::new(library());
    let id = h.save_server("nas.local");

    let events = collect(h.share_importer().start(id, Vec::new())).await;
    assert_matches!(events.last(), Some(ImportEvent::Error(message)) if message.contains("No share selected"));
}

#[tokio::test]
async fn local_import_uses_local_urls() {
    let dir = tempfile::tempdir().unwrap();
    let season = dir.path().join("Shows/Bar/Season 2");
    std::fs::create_dir_all(&season).unwrap();
    std::fs::write(season.join("Bar.S02E01.mp4"), b"x").unwrap();
    std::fs::create_dir_all(dir.path().join("Movies")).unwrap();
    std::fs::write(dir.path().join("Movies/Heat.mkv"), b"x").unwrap();

    let h = TestHarness::new(MemoryShareConnector::new());
    let added = h
        .local_importer()
        .start(vec![dir.path().to_path_buf()])
        .finish(|_| {})
        .await
        .unwrap();
    assert_eq!(added, 2);

    let bar = h.repository.get("bar_s02.json").unwrap().unwrap();
    assert_eq!(bar.videos.len(), 1);
    assert!(bar.videos[0]
        .playable_url
        .starts_with(&format!("http://127.0.0.1:{LOCAL_PORT}/")));
    assert!(bar.videos[0].playable_url.ends_with("/Season%202/Bar.S02E01.mp4"));

    let heat = h.repository.get("heat.json").unwrap().unwrap();
    assert_eq!(heat.videos[0].title, "Heat");
}

#[tokio::test]
async fn local_import_without_roots_fails() {
    let h = TestHarness::new(MemoryShareConnector::new());
    let err = h.local_importer().start(Vec::new()).finish(|_| {}).await;
    assert!(err.unwrap_err().to_string().contains("No import roots"));
}
