use std::path::PathBuf;

use tracing::info;

use super::{describe, spawn_run, store_playlists, ImportHandle, Reporter};
use crate::config::CoversConfig;
use crate::covers::CoverResolver;
use crate::gateway::urls::local_url;
use crate::playlists::PlaylistRepository;
use crate::walker::list_local_video_files;

/// Imports playlists from local directories, served by the local file server.
#[derive(Clone)]
pub struct LocalImporter {
    pub repository: PlaylistRepository,
    pub covers: CoversConfig,
    /// Port of the local file server the playable URLs point at.
    pub local_port: u16,
}

impl LocalImporter {
    pub fn start(&self, roots: Vec<PathBuf>) -> ImportHandle {
        let importer = self.clone();
        spawn_run(move |reporter| async move {
            importer.run(reporter, roots).await;
        })
    }

    async fn run(self, reporter: Reporter, roots: Vec<PathBuf>) {
        if roots.is_empty() {
            return reporter.error("No import roots given").await;
        }

        reporter
            .progress(format!("Scanning {} local roots", roots.len()))
            .await;
        let files = list_local_video_files(roots).await;
        if files.is_empty() {
            return reporter.error("No video files found").await;
        }
        reporter
            .progress(format!("Found {} video files", files.len()))
            .await;

        let mut resolver = CoverResolver::from_config(&self.covers);
        let mut items = Vec::with_capacity(files.len());
        for path in files {
            let url = local_url(self.local_port, &path);
            items.push(describe(&mut resolver, path.to_string_lossy().into_owned(), url).await);
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
