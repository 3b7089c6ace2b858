//! Path utilities for detecting video files and noise directories.
//!
//! These rules are shared by the remote share walker and the local
//! filesystem walker so both enumerate the same kind of files.

use std::path::Path;

/// List of supported video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "webm", "mov", "flv", "mpg", "mpeg", "m4v", "ts", "3gp", "wmv",
];

/// Directory name fragments that never contain library content.
///
/// Matched case-insensitively as substrings of a single directory name.
const NOISE_DIRECTORIES: &[&str] = &[
    "$recycle.bin",
    "recycler",
    "#recycle",
    ".recycle",
    ".trash",
    "system volume information",
    "lost+found",
    "@eadir",
    ".appledouble",
    "$extend",
];

/// Path fragments for application-private storage on device volumes.
///
/// Matched case-insensitively against the `/`-joined path.
const PRIVATE_PATH_FRAGMENTS: &[&str] = &["android/data", "android/obb", "/.thumbnails"];

/// Check if a file name has a video extension.
///
/// # Examples
///
/// ```
/// use sharestream_common::paths::is_video_name;
///
/// assert!(is_video_name("movie.MKV"));
/// assert!(is_video_name("clip.3gp"));
/// assert!(!is_video_name("subtitle.srt"));
/// assert!(!is_video_name("mkv"));
/// ```
pub fn is_video_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

/// Check if a path has a video file extension.
pub fn is_video_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(is_video_name)
        .unwrap_or(false)
}

/// Check if a directory name is a recycle bin or system-reserved folder.
///
/// # Examples
///
/// ```
/// use sharestream_common::paths::is_noise_directory;
///
/// assert!(is_noise_directory("$RECYCLE.BIN"));
/// assert!(is_noise_directory("System Volume Information"));
/// assert!(!is_noise_directory("Movies"));
/// ```
pub fn is_noise_directory(name: &str) -> bool {
    let lower = name.to_lowercase();
    NOISE_DIRECTORIES.iter().any(|noise| lower.contains(noise))
}

/// Check if a local path points into app-private storage.
pub fn is_private_path(path: &Path) -> bool {
    let joined = path.to_string_lossy().replace('\\', "/").to_lowercase();
    PRIVATE_PATH_FRAGMENTS
        .iter()
        .any(|fragment| joined.contains(fragment))
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Guess the MIME type of a video file from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "flv" => "video/x-flv",
        "mpg" | "mpeg" => "video/mpeg",
        "ts" => "video/mp2t",
        "3gp" => "video/3gpp",
        "wmv" => "video/x-ms-wmv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_extension_is_video() {
        for ext in video_extensions() {
            assert!(is_video_name(&format!("a.{ext}")), "{ext}");
            assert!(is_video_name(&format!("a.{}", ext.to_uppercase())), "{ext}");
        }
    }

    #[test]
    fn test_non_video_names() {
        assert!(!is_video_name("notes.txt"));
        assert!(!is_video_name("poster.jpg"));
        assert!(!is_video_name(".mkv"));
        assert!(!is_video_name("noext"));
    }

    #[test]
    fn test_is_video_file_path() {
        assert!(is_video_file(Path::new("/media/Show/S01/ep.mkv")));
        assert!(!is_video_file(Path::new("/media/Show/S01")));
    }

    #[test]
    fn test_noise_directory_substring_match() {
        assert!(is_noise_directory("#recycle"));
        assert!(is_noise_directory("@eaDir"));
        assert!(is_noise_directory(".Trash-1000"));
        assert!(!is_noise_directory("Season 1"));
    }

    #[test]
    fn test_private_path() {
        assert!(is_private_path(Path::new(
            "/storage/emulated/0/Android/data/com.app"
        )));
        assert!(is_private_path(Path::new("/sdcard/Android/obb")));
        assert!(!is_private_path(Path::new("/sdcard/Movies")));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.mp4"), "video/mp4");
        assert_eq!(content_type_for("a.MKV"), "video/x-matroska");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
