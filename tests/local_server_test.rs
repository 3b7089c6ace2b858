//! Integration tests for the local file server.

mod common;

use sharestream::gateway::urls::local_url;

fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let movies = dir.path().join("Movies");
    std::fs::create_dir_all(&movies).unwrap();
    let file = movies.join("Big Film #2.mkv");
    let data: Vec<u8> = (0..4096u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(&file, data).unwrap();
    (dir, file)
}

fn url_for(addr: std::net::SocketAddr, path: &std::path::Path) -> String {
    local_url(addr.port(), path)
}

#[tokio::test]
async fn serves_file_inside_root() {
    let (dir, file) = fixture();
    let addr = common::serve_local(dir.path()).await;

    let resp = reqwest::get(url_for(addr, &file)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "video/x-matroska"
    );
    assert_eq!(resp.bytes().await.unwrap().len(), 4096);
}

#[tokio::test]
async fn honours_ranges() {
    let (dir, file) = fixture();
    let addr = common::serve_local(dir.path()).await;

    let resp = reqwest::Client::new()
        .get(url_for(addr, &file))
        .header("Range", "bytes=100-199")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(
        resp.headers().get("content-range").unwrap().to_str().unwrap(),
        "bytes 100-199/4096"
    );
    let body = resp.bytes().await.unwrap();
    let expected: Vec<u8> = (100..200u32).map(|i| i as u8).collect();
    assert_eq!(body.as_ref(), expected.as_slice());

    let resp = reqwest::Client::new()
        .get(url_for(addr, &file))
        .header("Range", "bytes=5000-")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn refuses_paths_outside_root() {
    let (dir, _) = fixture();
    let (other, outside) = fixture();
    let addr = common::serve_local(&dir.path().join("Movies")).await;

    let resp = reqwest::get(url_for(addr, &outside)).await.unwrap();
    assert_eq!(resp.status(), 403);
    drop(other);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let (dir, _) = fixture();
    let addr = common::serve_local(dir.path()).await;

    let resp = reqwest::get(url_for(addr, &dir.path().join("Movies/nope.mkv")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = reqwest::get(url_for(addr, &dir.path().join("Movies")))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
