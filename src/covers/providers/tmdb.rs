//! TMDB (The Movie Database) cover provider.
//!
//! Uses the v3 `search/multi` endpoint and takes the first result that has
//! a poster.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).

use std::num::NonZeroU32;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::covers::{CoverMetadata, CoverProvider};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const MAX_RETRIES: u32 = 3;

/// Trailing `s01 02` of an episode query.
static EPISODE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+s\d{2}\s+\d{2,3}$").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    results: Vec<TmdbMultiResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbMultiResult {
    id: u64,
    media_type: Option<String>,
    poster_path: Option<String>,
}

pub struct TmdbProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    pub fn new(api_key: String, language: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let quota = Quota::per_second(NonZeroU32::new(4).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = RateLimiter::direct(quota);

        Self {
            client,
            base_url: TMDB_BASE_URL.to_string(),
            api_key,
            language,
            rate_limiter,
        }
    }

    /// Point the provider at another API root.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> anyhow::Result<reqwest::Response> {
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .with_context(|| format!("TMDB request failed: {url}"))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let resp = resp
                .error_for_status()
                .with_context(|| format!("TMDB request returned error: {url}"))?;

            return Ok(resp);
        }
    }
}

/// TMDB knows series, not episodes: drop the episode suffix.
fn search_text(query: &str) -> &str {
    match EPISODE_SUFFIX.find(query) {
        Some(m) if m.start() > 0 => &query[..m.start()],
        _ => query,
    }
}

/// Convert a TMDB poster path fragment to a full URL.
fn image_url(path: &str) -> String {
    format!("{TMDB_IMAGE_BASE}{path}")
}

#[async_trait]
impl CoverProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    async fn lookup(&self, query: &str) -> anyhow::Result<Option<CoverMetadata>> {
        let text = search_text(query);
        let url = format!("{}/search/multi", self.base_url);
        debug!(query = %text, "TMDB search multi");

        let body: TmdbSearchResponse = self
            .get(
                &url,
                &[
                    ("api_key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                    ("query", text),
                ],
            )
            .await?
            .json()
            .await
            .context("failed to parse TMDB search response")?;

        Ok(body
            .results
            .into_iter()
            .find(|r| r.poster_path.as_deref().is_some_and(|p| !p.is_empty()))
            .map(|r| CoverMetadata {
                matched_id: Some(match r.media_type {
                    Some(kind) => format!("{kind}:{}", r.id),
                    None => r.id.to_string(),
                }),
                skip_seconds: None,
                poster_url: r.poster_path.as_deref().map(image_url),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_text_strips_episode() {
        assert_eq!(search_text("breaking bad s01 02"), "breaking bad");
        assert_eq!(search_text("the matrix 1999"), "the matrix 1999");
        assert_eq!(search_text("s01 02"), "s01 02");
    }

    #[test]
    fn image_url_construction() {
        assert_eq!(
            image_url("/abc123.jpg"),
            "https://image.tmdb.org/t/p/w500/abc123.jpg"
        );
    }
}
