//! Persistent playlist store.
//!
//! The file name is a playlist's identity: adding a name that already
//! exists is a no-op, whatever the contents. Every mutation is committed
//! before the call returns.

use rand::seq::SliceRandom;
use sharestream_common::{parse_video_list, Error, Playlist, Result, VideoItem};
use sharestream_db::pool::{get_conn, DbPool};
use sharestream_db::queries::playlists as queries;
use sharestream_parser::unique_name;
use tracing::{debug, info, warn};

/// Base name for merged playlists.
pub const AGGREGATE_NAME: &str = "aggregate.json";

#[derive(Clone)]
pub struct PlaylistRepository {
    pool: DbPool,
}

fn validate(playlist: &Playlist) -> Result<()> {
    if playlist.file_name.trim().is_empty() {
        return Err(Error::invalid_input("playlist name cannot be empty"));
    }
    if let Some(item) = playlist
        .videos
        .iter()
        .find(|v| v.playable_url.trim().is_empty())
    {
        return Err(Error::invalid_input(format!(
            "video {:?} in {} has no playable URL",
            item.title, playlist.file_name
        )));
    }
    Ok(())
}

fn encode(videos: &[VideoItem]) -> Result<String> {
    serde_json::to_string(videos)
        .map_err(|e| Error::internal(format!("failed to encode playlist: {}", e)))
}

impl PlaylistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store `playlist` unless its name is taken. Returns `true` if stored.
    pub fn add(&self, playlist: &Playlist) -> Result<bool> {
        validate(playlist)?;
        let conn = get_conn(&self.pool)?;
        let inserted =
            queries::insert_if_absent(&conn, &playlist.file_name, &encode(&playlist.videos)?)?;
        if inserted {
            debug!(name = %playlist.file_name, videos = playlist.videos.len(), "Added playlist");
        } else {
            debug!(name = %playlist.file_name, "Playlist already exists, skipped");
        }
        Ok(inserted)
    }

    /// Store `playlist`, replacing any playlist with the same name.
    pub fn upsert(&self, playlist: &Playlist) -> Result<()> {
        validate(playlist)?;
        let conn = get_conn(&self.pool)?;
        queries::upsert(&conn, &playlist.file_name, &encode(&playlist.videos)?)
    }

    pub fn remove(&self, name: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        queries::delete(&conn, name)
    }

    pub fn remove_all(&self) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        let removed = queries::delete_all(&conn)?;
        info!("Removed {} playlists", removed);
        Ok(removed)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        queries::exists(&conn, name)
    }

    pub fn get(&self, name: &str) -> Result<Option<Playlist>> {
        let conn = get_conn(&self.pool)?;
        let Some(row) = queries::get(&conn, name)? else {
            return Ok(None);
        };
        let videos = parse_video_list(&row.videos)?;
        Ok(Some(Playlist::new(row.file_name, videos)))
    }

    /// Every readable playlist in insertion order.
    ///
    /// Rows that fail to decode are skipped; if the store itself cannot be
    /// read the result is empty.
    pub fn list(&self) -> Vec<Playlist> {
        let rows = match get_conn(&self.pool).and_then(|conn| queries::list(&conn)) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to load playlists: {}", e);
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter_map(|row| match parse_video_list(&row.videos) {
                Ok(videos) => Some(Playlist::new(row.file_name, videos)),
                Err(e) => {
                    warn!(name = %row.file_name, "Skipping corrupt playlist: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let conn = get_conn(&self.pool)?;
        queries::list_names(&conn)
    }

    /// `candidate`, or the first `_2`, `_3`, … variant not yet stored.
    pub fn unique_name(&self, candidate: &str) -> Result<String> {
        let conn = get_conn(&self.pool)?;
        let taken: std::collections::HashSet<String> =
            queries::list_names(&conn)?.into_iter().collect();
        Ok(unique_name(candidate, |name| taken.contains(name)))
    }

    /// Concatenate `sources` into a new playlist named after `base` and
    /// store it. Fails if any source is missing.
    pub fn merge(&self, sources: &[String], shuffle: bool, base: Option<&str>) -> Result<Playlist> {
        if sources.is_empty() {
            return Err(Error::invalid_input("nothing to merge"));
        }

        let mut videos = Vec::new();
        for name in sources {
            let playlist = self
                .get(name)?
                .ok_or_else(|| Error::not_found(format!("playlist {}", name)))?;
            videos.extend(playlist.videos);
        }
        if shuffle {
            videos.shuffle(&mut rand::thread_rng());
        }

        let name = self.unique_name(base.unwrap_or(AGGREGATE_NAME))?;
        let merged = Playlist::new(name, videos);
        self.add(&merged)?;
        info!(
            name = %merged.file_name,
            sources = sources.len(),
            videos = merged.videos.len(),
            "Merged playlists"
        );
        Ok(merged)
    }
}
