use std::sync::Arc;

use sharestream_common::ServerId;
use tracing::{info, warn};

use super::{describe, spawn_run, store_playlists, ImportHandle, Reporter};
use crate::config::CoversConfig;
use crate::covers::CoverResolver;
use crate::gateway::urls::share_url;
use crate::playlists::PlaylistRepository;
use crate::share::{ShareConnector, ShareLease};
use crate::vault::CredentialVault;
use crate::walker::list_video_files;

/// Imports playlists from shares on a saved server.
#[derive(Clone)]
pub struct ShareImporter {
    pub vault: Arc<CredentialVault>,
    pub connector: Arc<dyn ShareConnector>,
    pub repository: PlaylistRepository,
    pub covers: CoversConfig,
    /// Port of the streaming gateway the playable URLs point at.
    pub gateway_port: u16,
}

impl ShareImporter {
    /// Start importing `shares` of `server_id`. With no shares given, the
    /// last share used on that server is imported.
    pub fn start(&self, server_id: ServerId, shares: Vec<String>) -> ImportHandle {
        let importer = self.clone();
        spawn_run(move |reporter| async move {
            importer.run(reporter, server_id, shares).await;
        })
    }

    async fn run(self, reporter: Reporter, server_id: ServerId, shares: Vec<String>) {
        let stored = match self.vault.load(&server_id) {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                return reporter
                    .error(format!("No saved credentials for server {}", server_id))
                    .await
            }
            Err(e) => return reporter.error(format!("Cannot read vault: {}", e)).await,
        };

        let shares = if shares.is_empty() {
            match self.vault.get_last_share(Some(&server_id)) {
                Ok(Some(share)) => vec![share],
                _ => return reporter.error("No share selected").await,
            }
        } else {
            shares
        };

        let mut found: Vec<(String, String)> = Vec::new();
        for share in &shares {
            reporter
                .progress(format!("Scanning {} on {}", share, stored.endpoint))
                .await;

            let mut lease = match ShareLease::authenticate(
                self.connector.as_ref(),
                &stored.endpoint,
                &stored.credentials,
            )
            .await
            {
                Ok(lease) => lease,
                Err(e) => {
                    warn!(share = %share, "Server unreachable: {}", e);
                    reporter
                        .progress(format!("Skipping {}: {}", share, e))
                        .await;
                    continue;
                }
            };
            if let Err(e) = lease.connect_share(share).await {
                warn!(share = %share, "Cannot open share: {}", e);
                reporter
                    .progress(format!("Skipping {}: {}", share, e))
                    .await;
                continue;
            }

            let files = match lease.tree() {
                Some(tree) => list_video_files(tree, "").await,
                None => Default::default(),
            };
            lease.release().await;

            reporter
                .progress(format!("Found {} video files in {}", files.len(), share))
                .await;
            if !files.is_empty() {
                if let Err(e) = self.vault.save_last_share(&server_id, share) {
                    warn!("Failed to remember last share: {}", e);
                }
            }
            found.extend(files.into_iter().map(|path| (share.clone(), path)));
        }

        if found.is_empty() {
            return reporter.error("No video files found").await;
        }

        let mut resolver = CoverResolver::from_config(&self.covers);
        let mut items = Vec::with_capacity(found.len());
        for (share, path) in found {
            let url = share_url(self.gateway_port, server_id.as_str(), &share, &path);
            items.push(describe(&mut resolver, path, url).await);
        }
        info!(
            items = items.len(),
            cover_lookups = resolver.lookups(),
            "Resolved covers"
        );

        match store_playlists(&self.repository, items) {
            Ok(added) => reporter.done(added).await,
            Err(e) => reporter.error(format!("Failed to save playlists: {}", e)).await,
        }
    }
}
