use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use sharestream_common::paths::{is_noise_directory, is_private_path, is_video_file};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    is_noise_directory(&name) || is_private_path(entry.path())
}

fn walk_root(root: &Path, found: &mut BTreeSet<PathBuf>) {
    info!("Scanning directory: {:?}", root);

    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry below {:?}: {}", root, e);
                continue;
            }
        };

        if entry.file_type().is_dir() || !is_video_file(entry.path()) {
            continue;
        }

        // Canonical paths collapse files reached through overlapping roots.
        let path = std::fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.into_path());
        found.insert(path);
    }
}

/// Every video file below any of `roots`, deduplicated by canonical path.
pub fn list_local_video_files_blocking(roots: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut found = BTreeSet::new();
    for root in roots {
        if root.exists() {
            walk_root(root, &mut found);
        } else {
            warn!("Import root does not exist: {:?}", root);
        }
    }
    debug!("Found {} local video files", found.len());
    found
}

/// [`list_local_video_files_blocking`] on the blocking pool.
pub async fn list_local_video_files(roots: Vec<PathBuf>) -> BTreeSet<PathBuf> {
    match tokio::task::spawn_blocking(move || list_local_video_files_blocking(&roots)).await {
        Ok(found) => found,
        Err(e) => {
            warn!("Local walk task failed: {}", e);
            BTreeSet::new()
        }
    }
}
