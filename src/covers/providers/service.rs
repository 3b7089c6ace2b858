//! Self-hosted cover service.
//!
//! `GET {base_url}/cover?q=<query>` answers `200` with
//! `{"id": ..., "skip": ..., "poster": ...}` or `404` when it has nothing.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::covers::{CoverMetadata, CoverProvider};

#[derive(Debug, Deserialize)]
struct ServiceCover {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    skip: Option<u32>,
    #[serde(default)]
    poster: Option<String>,
}

pub struct ServiceProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceProvider {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CoverProvider for ServiceProvider {
    fn name(&self) -> &'static str {
        "service"
    }

    async fn lookup(&self, query: &str) -> anyhow::Result<Option<CoverMetadata>> {
        let url = format!("{}/cover", self.base_url);
        debug!(query = %query, "Cover service lookup");

        let resp = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .with_context(|| format!("cover service request failed: {url}"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let cover: ServiceCover = resp
            .error_for_status()
            .with_context(|| format!("cover service returned error: {url}"))?
            .json()
            .await
            .context("failed to parse cover service response")?;

        let matched_id = cover.id.and_then(|id| match id {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Ok(Some(CoverMetadata {
            matched_id,
            skip_seconds: cover.skip,
            poster_url: cover.poster.filter(|p| !p.trim().is_empty()),
        }))
    }
}
