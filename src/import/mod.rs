//! Background import runs.
//!
//! An import walks its sources, resolves covers, classifies the files into
//! playlists and stores the playlists whose names are new. Each run is one
//! spawned task reporting through an [`ImportHandle`].

mod local;
mod share;

pub use local::LocalImporter;
pub use share::ShareImporter;

use sharestream_common::{Playlist, VideoItem};
use sharestream_parser::{analyze, classify};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::covers::CoverResolver;
use crate::playlists::PlaylistRepository;

const EVENT_BUFFER: usize = 64;

/// Progress of an import run. A run ends with exactly one `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    Progress(String),
    /// Number of playlists added.
    Done(usize),
    Error(String),
}

/// Receiving end of a running import.
pub struct ImportHandle {
    events: mpsc::Receiver<ImportEvent>,
    join: JoinHandle<()>,
}

impl ImportHandle {
    pub async fn next_event(&mut self) -> Option<ImportEvent> {
        self.events.recv().await
    }

    /// Wait for the run to end, passing progress messages to `on_progress`.
    pub async fn finish<F>(mut self, mut on_progress: F) -> anyhow::Result<usize>
    where
        F: FnMut(&str),
    {
        while let Some(event) = self.events.recv().await {
            match event {
                ImportEvent::Progress(message) => on_progress(&message),
                ImportEvent::Done(count) => return Ok(count),
                ImportEvent::Error(message) => anyhow::bail!("{}", message),
            }
        }
        match self.join.await {
            Err(e) => anyhow::bail!("import task failed: {}", e),
            Ok(()) => anyhow::bail!("import ended without a result"),
        }
    }
}

#[derive(Clone)]
struct Reporter {
    tx: mpsc::Sender<ImportEvent>,
}

impl Reporter {
    async fn progress(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        let _ = self.tx.send(ImportEvent::Progress(message)).await;
    }

    async fn done(self, count: usize) {
        info!("Import finished, {} playlists added", count);
        let _ = self.tx.send(ImportEvent::Done(count)).await;
    }

    async fn error(self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Import failed: {}", message);
        let _ = self.tx.send(ImportEvent::Error(message)).await;
    }
}

/// Spawn `run` with a fresh event channel.
fn spawn_run<F, Fut>(run: F) -> ImportHandle
where
    F: FnOnce(Reporter) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (tx, events) = mpsc::channel(EVENT_BUFFER);
    let join = tokio::spawn(run(Reporter { tx }));
    ImportHandle { events, join }
}

/// One enumerated file, ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMediaItem {
    /// Path used for classification.
    pub path: String,
    pub title: String,
    pub poster_url: String,
    pub skip_seconds: u32,
    pub playable_url: String,
}

impl RawMediaItem {
    fn into_video(self) -> VideoItem {
        VideoItem {
            title: self.title,
            skip_seconds: self.skip_seconds,
            delay_seconds: 0,
            background_url: self.poster_url.clone(),
            poster_url: self.poster_url,
            playable_url: self.playable_url,
        }
    }
}

/// Build a raw item for `path`, looking up its cover.
async fn describe(
    resolver: &mut CoverResolver,
    path: String,
    playable_url: String,
) -> RawMediaItem {
    let analysis = analyze(&path);
    let cover = resolver.resolve(&analysis.cover_query()).await;
    RawMediaItem {
        title: analysis.title(),
        poster_url: resolver.poster_or_placeholder(cover.as_ref()),
        skip_seconds: cover.and_then(|c| c.skip_seconds).unwrap_or(0),
        playable_url,
        path,
    }
}

/// Classify `items` and add every playlist whose name is not stored yet.
/// Returns the number of playlists added.
fn store_playlists(
    repository: &PlaylistRepository,
    items: Vec<RawMediaItem>,
) -> sharestream_common::Result<usize> {
    let mut added = 0;
    for group in classify(items, |item| item.path.as_str()) {
        if repository.exists(&group.file_name)? {
            debug!(name = %group.file_name, "Already imported, skipping");
            continue;
        }
        let videos = group.entries.into_iter().map(RawMediaItem::into_video).collect();
        if repository.add(&Playlist::new(group.file_name, videos))? {
            added += 1;
        }
    }
    Ok(added)
}
