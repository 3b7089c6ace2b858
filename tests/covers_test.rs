//! Integration tests for cover providers against mock HTTP servers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sharestream::config::{CoverProviderKind, CoversConfig};
use sharestream::covers::{CoverProvider, CoverResolver, ServiceProvider, TmdbProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn service_provider_parses_cover() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cover"))
        .and(query_param("q", "the matrix"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "skip": 42,
            "poster": "https://img.example/matrix.jpg"
        })))
        .mount(&server)
        .await;

    let provider = ServiceProvider::new(server.uri(), TIMEOUT);
    let cover = provider.lookup("the matrix").await.unwrap().unwrap();
    assert_eq!(cover.matched_id.as_deref(), Some("603"));
    assert_eq!(cover.skip_seconds, Some(42));
    assert_eq!(cover.poster_url.as_deref(), Some("https://img.example/matrix.jpg"));
}

#[tokio::test]
async fn service_provider_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cover"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let provider = ServiceProvider::new(server.uri(), TIMEOUT);
    assert!(provider.lookup("unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn service_errors_fall_back_to_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cover"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let provider: Arc<dyn CoverProvider> = Arc::new(ServiceProvider::new(server.uri(), TIMEOUT));
    let mut resolver = CoverResolver::new(Some(provider), "placeholder.png");

    let first = resolver.resolve("Heat").await;
    let second = resolver.resolve("heat ").await;
    assert!(first.is_none());
    assert!(second.is_none());
    assert_eq!(resolver.poster_or_placeholder(first.as_ref()), "placeholder.png");
    assert_eq!(resolver.lookups(), 1);
}

#[tokio::test]
async fn tmdb_provider_takes_first_result_with_poster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .and(query_param("api_key", "k"))
        .and(query_param("query", "breaking bad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": 1, "media_type": "person", "poster_path": null },
                { "id": 1396, "media_type": "tv", "poster_path": "/bb.jpg" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TmdbProvider::new("k".into(), "en-US".into(), TIMEOUT)
        .with_base_url(server.uri());
    let cover = provider.lookup("breaking bad s01 02").await.unwrap().unwrap();
    assert_eq!(cover.matched_id.as_deref(), Some("tv:1396"));
    assert_eq!(
        cover.poster_url.as_deref(),
        Some("https://image.tmdb.org/t/p/w500/bb.jpg")
    );
    assert_eq!(cover.skip_seconds, None);
}

#[tokio::test]
async fn tmdb_retries_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let provider = TmdbProvider::new("k".into(), "en-US".into(), TIMEOUT)
        .with_base_url(server.uri());
    assert!(provider.lookup("nothing").await.unwrap().is_none());
}

#[tokio::test]
async fn resolver_from_config_memoizes_per_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "x",
            "poster": "https://img.example/x.jpg"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let config = CoversConfig {
        enabled: true,
        provider: CoverProviderKind::Service,
        base_url: Some(server.uri()),
        ..CoversConfig::default()
    };

    let mut resolver = CoverResolver::from_config(&config);
    for _ in 0..3 {
        let cover = resolver.resolve("foo s01 02").await;
        assert_eq!(
            resolver.poster_or_placeholder(cover.as_ref()),
            "https://img.example/x.jpg"
        );
    }
    resolver.resolve("bar").await;
    assert_eq!(resolver.lookups(), 2);
}
