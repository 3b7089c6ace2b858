use std::collections::BTreeSet;

use sharestream_common::paths::{is_noise_directory, is_video_name};
use tracing::{debug, warn};

use crate::share::{join_path, ShareTree};

/// Every video file below `root` in a connected share, as share-relative
/// `/`-separated paths.
pub async fn list_video_files(tree: &dyn ShareTree, root: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut pending = vec![root.trim_matches('/').to_string()];

    while let Some(dir) = pending.pop() {
        let entries = match tree.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping unreadable directory {:?}: {}", dir, e);
                continue;
            }
        };

        for entry in entries {
            if entry.name == "." || entry.name == ".." || entry.name.is_empty() {
                continue;
            }
            let path = join_path(&dir, &entry.name);
            if entry.is_dir {
                if is_noise_directory(&entry.name) {
                    debug!("Skipping system directory {:?}", path);
                    continue;
                }
                pending.push(path);
            } else if is_video_name(&entry.name) {
                found.insert(path);
            }
        }
    }

    debug!("Found {} video files below {:?}", found.len(), root);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{MemoryShareConnector, ShareConnector};
    use sharestream_common::ShareCredentials;

    async fn walk(connector: MemoryShareConnector, root: &str) -> BTreeSet<String> {
        let creds = ShareCredentials {
            username: "u".into(),
            password: "p".into(),
            domain: None,
        };
        let mut transport = connector.connect("nas", 445).await.unwrap();
        let mut session = transport.authenticate(&creds).await.unwrap();
        let tree = session.connect_share("Media").await.unwrap();
        list_video_files(&*tree, root).await
    }

    #[tokio::test]
    async fn test_filters_and_recurses() {
        let connector = MemoryShareConnector::new()
            .with_file("Media", "Shows/Foo/Season 1/Foo.S01E01.mkv", vec![])
            .with_file("Media", "Shows/Foo/Season 1/Foo.S01E01.srt", vec![])
            .with_file("Media", "$RECYCLE.BIN/old.mkv", vec![])
            .with_file("Media", "System Volume Information/x.mp4", vec![])
            .with_file("Media", "Movies/A.MP4", vec![])
            .with_file("Media", ".library/E.mkv", vec![]);

        let files = walk(connector, "/").await;
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec![
                ".library/E.mkv",
                "Movies/A.MP4",
                "Shows/Foo/Season 1/Foo.S01E01.mkv"
            ]
        );
    }

    #[tokio::test]
    async fn test_unreadable_directory_is_skipped() {
        let connector = MemoryShareConnector::new()
            .with_file("Media", "Locked/a.mkv", vec![])
            .with_file("Media", "Open/b.mkv", vec![])
            .with_unreadable_dir("Media", "Locked");

        let files = walk(connector, "").await;
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["Open/b.mkv"]);
    }

    #[tokio::test]
    async fn test_subdirectory_root() {
        let connector = MemoryShareConnector::new()
            .with_file("Media", "Movies/a.mkv", vec![])
            .with_file("Media", "Shows/b.mkv", vec![]);

        let files = walk(connector, "Movies").await;
        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["Movies/a.mkv"]);
    }
}
