//! Playlist file naming.

use crate::normalize::slug;

const EXTENSION: &str = ".json";

/// File name of a series playlist: `<series>_s<SS>.json`.
pub fn series_file_name(series: &str, season: u32) -> String {
    format!("{}_s{:02}{EXTENSION}", slug(series), season)
}

/// File name of a multi-movie saga playlist: `saga_<saga>.json`.
pub fn saga_file_name(saga: &str) -> String {
    format!("saga_{}{EXTENSION}", slug(saga))
}

/// File name of a single-movie playlist, named after the movie.
pub fn movie_file_name(title: &str) -> String {
    format!("{}{EXTENSION}", slug(title))
}

/// First name derived from `candidate` that `is_taken` rejects: the
/// candidate itself, then `<stem>_2<ext>`, `<stem>_3<ext>`, ….
///
/// ```
/// use sharestream_parser::naming::unique_name;
///
/// let taken = ["X.json", "X_2.json"];
/// assert_eq!(unique_name("Y.json", |n| taken.contains(&n)), "Y.json");
/// assert_eq!(unique_name("X.json", |n| taken.contains(&n)), "X_3.json");
/// ```
pub fn unique_name(candidate: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(candidate) {
        return candidate.to_string();
    }

    let (stem, ext) = match candidate.rfind('.') {
        Some(idx) if idx > 0 => candidate.split_at(idx),
        _ => (candidate, ""),
    };

    (2u32..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|name| !is_taken(name))
        .unwrap_or_else(|| candidate.to_string())
}
