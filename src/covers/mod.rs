//! Cover art lookup for imported items.
//!
//! A [`CoverResolver`] lives for one import run. It asks its provider at most
//! once per distinct query and turns every failure into "no cover", so a
//! flaky lookup service never fails an import.

pub mod providers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{CoverProviderKind, CoversConfig};

pub use providers::{ServiceProvider, TmdbProvider};

/// What a provider knows about one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverMetadata {
    pub matched_id: Option<String>,
    pub skip_seconds: Option<u32>,
    pub poster_url: Option<String>,
}

#[async_trait]
pub trait CoverProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Look up `query`. `Ok(None)` means the provider has nothing for it.
    async fn lookup(&self, query: &str) -> anyhow::Result<Option<CoverMetadata>>;
}

/// Build the provider described by `config`, or `None` when covers are
/// disabled.
pub fn provider_from_config(config: &CoversConfig) -> Option<Arc<dyn CoverProvider>> {
    if !config.enabled {
        return None;
    }
    let timeout = Duration::from_secs(config.timeout_secs.max(1));

    let provider: Arc<dyn CoverProvider> = match config.provider {
        CoverProviderKind::Tmdb => {
            let mut tmdb = TmdbProvider::new(
                config.api_key.clone().unwrap_or_default(),
                config.language.clone(),
                timeout,
            );
            if let Some(base) = &config.base_url {
                tmdb = tmdb.with_base_url(base.clone());
            }
            Arc::new(tmdb)
        }
        CoverProviderKind::Service => Arc::new(ServiceProvider::new(
            config.base_url.clone().unwrap_or_default(),
            timeout,
        )),
    };
    Some(provider)
}

/// Per-run memoizing front of a [`CoverProvider`].
pub struct CoverResolver {
    provider: Option<Arc<dyn CoverProvider>>,
    placeholder: String,
    memo: HashMap<String, Option<CoverMetadata>>,
    lookups: usize,
}

impl CoverResolver {
    pub fn new(provider: Option<Arc<dyn CoverProvider>>, placeholder: impl Into<String>) -> Self {
        Self {
            provider,
            placeholder: placeholder.into(),
            memo: HashMap::new(),
            lookups: 0,
        }
    }

    pub fn from_config(config: &CoversConfig) -> Self {
        Self::new(
            provider_from_config(config),
            config.placeholder_poster.clone(),
        )
    }

    /// Metadata for `query`, or `None` if unknown or the lookup failed.
    pub async fn resolve(&mut self, query: &str) -> Option<CoverMetadata> {
        let key = query.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }

        let result = match &self.provider {
            Some(provider) => {
                self.lookups += 1;
                match provider.lookup(&key).await {
                    Ok(found) => found,
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            query = %key,
                            "Cover lookup failed: {:#}",
                            e
                        );
                        None
                    }
                }
            }
            None => None,
        };

        debug!(query = %key, found = result.is_some(), "Resolved cover");
        self.memo.insert(key, result.clone());
        result
    }

    /// Poster from `metadata`, or the placeholder when absent or blank.
    pub fn poster_or_placeholder(&self, metadata: Option<&CoverMetadata>) -> String {
        metadata
            .and_then(|m| m.poster_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.placeholder)
            .to_string()
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Number of provider calls made so far.
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}
