//! Series/season and movie/saga grouping.
//!
//! [`classify`] is a pure function of its input: the same set of paths
//! always yields the same playlists, names and ordering.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::matchers::{is_part_marker, order_key, season_episode, season_folder};
use crate::naming::{movie_file_name, saga_file_name, series_file_name, unique_name};
use crate::normalize::{display_title, file_stem, normalize, segments};

/// Saga used for movies without a usable parent folder.
pub const DEFAULT_SAGA: &str = "Movies";

/// What a single path was recognised as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    /// A file inside a season folder.
    Episode {
        /// Normalized series name (grandparent folder).
        series: String,
        /// Series folder name as found on disk.
        series_display: String,
        /// Season taken from the season folder.
        season: u32,
        /// `(season, episode)` parsed from the file name.
        numbering: Option<(u32, u32)>,
    },
    /// Anything else.
    Movie {
        /// Normalized saga name.
        saga: String,
        saga_display: String,
        /// Explicit position inside the saga, if the name carries one.
        order: Option<u32>,
        /// Cleaned display title.
        title: String,
    },
}

/// Classification of one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAnalysis {
    pub file_name: String,
    pub kind: MediaKind,
}

impl PathAnalysis {
    /// Human readable title for the item.
    pub fn title(&self) -> String {
        match &self.kind {
            MediaKind::Episode {
                series_display,
                numbering: Some((season, episode)),
                ..
            } => format!("{series_display} S{season:02}E{episode:02}"),
            MediaKind::Episode { .. } => display_title(file_stem(&self.file_name)),
            MediaKind::Movie { title, .. } => title.clone(),
        }
    }

    /// Query string used for cover lookups.
    ///
    /// Episodes with known numbering produce `"<series> s<SS> <EE>"`;
    /// everything else uses the normalized file name.
    pub fn cover_query(&self) -> String {
        match &self.kind {
            MediaKind::Episode {
                series,
                season,
                numbering: Some((_, episode)),
                ..
            } => format!("{series} s{season:02} {episode:02}"),
            _ => normalize(file_stem(&self.file_name)),
        }
    }
}

/// Recognise a single path.
///
/// ```
/// use sharestream_parser::classify::{analyze, MediaKind};
///
/// let analysis = analyze("Shows/Foo/Season 1/Foo.S01E02.mkv");
/// assert!(matches!(analysis.kind, MediaKind::Episode { season: 1, .. }));
///
/// let analysis = analyze("Movies/Trilogy/Part 2/Movie.mkv");
/// match analysis.kind {
///     MediaKind::Movie { saga_display, .. } => assert_eq!(saga_display, "Trilogy"),
///     _ => unreachable!(),
/// }
/// ```
pub fn analyze(path: &str) -> PathAnalysis {
    let parts = segments(path);
    let file_name = parts.last().copied().unwrap_or(path).to_string();
    let count = parts.len();

    if count >= 3 {
        if let Some(season) = season_folder(parts[count - 2]) {
            let series_display = parts[count - 3].to_string();
            return PathAnalysis {
                kind: MediaKind::Episode {
                    series: normalize(&series_display),
                    series_display,
                    season,
                    numbering: season_episode(file_stem(&file_name)),
                },
                file_name,
            };
        }
    }

    let parent = count.checked_sub(2).map(|i| parts[i]);
    let grandparent = count.checked_sub(3).map(|i| parts[i]);
    let saga_display = match parent {
        Some(folder) if is_part_marker(folder) => grandparent.unwrap_or(DEFAULT_SAGA),
        Some(folder) => folder,
        None => DEFAULT_SAGA,
    }
    .to_string();

    let stem = file_stem(&file_name);
    PathAnalysis {
        kind: MediaKind::Movie {
            saga: normalize(&saga_display),
            saga_display,
            order: order_key(stem),
            title: display_title(stem),
        },
        file_name,
    }
}

/// What a playlist groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    Series { series: String, season: u32 },
    Saga { saga: String },
}

/// One playlist produced by [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistGroup<T> {
    pub file_name: String,
    pub kind: GroupKind,
    pub entries: Vec<T>,
}

struct Ranked<T> {
    path: String,
    analysis: PathAnalysis,
    entry: T,
}

fn episode_order<T>(a: &Ranked<T>, b: &Ranked<T>) -> Ordering {
    let key = |r: &Ranked<T>| match &r.analysis.kind {
        MediaKind::Episode {
            numbering: Some((season, episode)),
            ..
        } => (false, *season, *episode),
        _ => (true, 0, 0),
    };
    key(a).cmp(&key(b)).then_with(|| a.path.cmp(&b.path))
}

fn movie_order<T>(a: &Ranked<T>, b: &Ranked<T>) -> Ordering {
    let key = |r: &Ranked<T>| match &r.analysis.kind {
        MediaKind::Movie { order, title, .. } => (order.unwrap_or(u32::MAX), normalize(title)),
        _ => (u32::MAX, String::new()),
    };
    key(a).cmp(&key(b)).then_with(|| a.path.cmp(&b.path))
}

/// Group entries into series and saga playlists.
///
/// Series playlists come first, ordered by `(series, season)`, followed by
/// saga playlists ordered by saga name. Names that collide within the batch
/// receive `_2`, `_3`, … suffixes.
///
/// ```
/// use sharestream_parser::classify::classify;
///
/// let paths = vec![
///     "Shows/Foo/Season 1/Foo.S01E02.mkv".to_string(),
///     "Shows/Foo/Season 1/Foo.S01E01.mkv".to_string(),
/// ];
/// let groups = classify(paths, |p| p.as_str());
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].file_name, "foo_s01.json");
/// assert!(groups[0].entries[0].ends_with("E01.mkv"));
/// ```
pub fn classify<T>(entries: Vec<T>, path_of: impl Fn(&T) -> &str) -> Vec<PlaylistGroup<T>> {
    let mut series: BTreeMap<(String, u32), Vec<Ranked<T>>> = BTreeMap::new();
    let mut sagas: BTreeMap<String, Vec<Ranked<T>>> = BTreeMap::new();

    for entry in entries {
        let path = path_of(&entry).to_string();
        let analysis = analyze(&path);
        let bucket = match &analysis.kind {
            MediaKind::Episode {
                series: name,
                season,
                ..
            } => Ok((name.clone(), *season)),
            MediaKind::Movie { saga, .. } => Err(saga.clone()),
        };
        let ranked = Ranked {
            path,
            analysis,
            entry,
        };
        match bucket {
            Ok(key) => series.entry(key).or_default().push(ranked),
            Err(saga) => sagas.entry(saga).or_default().push(ranked),
        }
    }

    let mut used: HashSet<String> = HashSet::new();
    let mut groups = Vec::with_capacity(series.len() + sagas.len());

    for ((name, season), mut members) in series {
        members.sort_by(episode_order);
        let file_name = unique_name(&series_file_name(&name, season), |n| used.contains(n));
        used.insert(file_name.clone());
        groups.push(PlaylistGroup {
            file_name,
            kind: GroupKind::Series {
                series: name,
                season,
            },
            entries: members.into_iter().map(|r| r.entry).collect(),
        });
    }

    for (saga, mut members) in sagas {
        members.sort_by(movie_order);
        let candidate = match members.as_slice() {
            [only] => movie_file_name(&only.analysis.title()),
            _ => saga_file_name(&saga),
        };
        let file_name = unique_name(&candidate, |n| used.contains(n));
        used.insert(file_name.clone());
        groups.push(PlaylistGroup {
            file_name,
            kind: GroupKind::Saga { saga },
            entries: members.into_iter().map(|r| r.entry).collect(),
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(paths: &[&str]) -> Vec<String> {
        let owned: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        classify(owned, |p| p.as_str())
            .into_iter()
            .map(|g| g.file_name)
            .collect()
    }

    #[test]
    fn test_two_segment_path_is_movie() {
        let analysis = analyze("Season 1/Ep.S01E01.mkv");
        assert!(matches!(analysis.kind, MediaKind::Movie { .. }));
    }

    #[test]
    fn test_bare_digit_season_folder() {
        let analysis = analyze("/tv/Lost/2/Lost.2x05.avi");
        match analysis.kind {
            MediaKind::Episode {
                series,
                season,
                numbering,
                ..
            } => {
                assert_eq!(series, "lost");
                assert_eq!(season, 2);
                assert_eq!(numbering, Some((2, 5)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_saga_fallbacks() {
        let standalone = analyze("/media/Standalone/Movie.mkv");
        assert!(matches!(
            standalone.kind,
            MediaKind::Movie { ref saga_display, .. } if saga_display == "Standalone"
        ));

        let root = analyze("Movie.mkv");
        assert!(matches!(
            root.kind,
            MediaKind::Movie { ref saga_display, .. } if saga_display == DEFAULT_SAGA
        ));

        let orphan_part = analyze("Part 2/Movie.mkv");
        assert!(matches!(
            orphan_part.kind,
            MediaKind::Movie { ref saga_display, .. } if saga_display == DEFAULT_SAGA
        ));
    }

    #[test]
    fn test_cover_query() {
        assert_eq!(
            analyze("TV/Foo Bar/Season 2/Foo.Bar.S02E07.mkv").cover_query(),
            "foo bar s02 07"
        );
        assert_eq!(
            analyze("TV/Foo/Season 2/extras.mkv").cover_query(),
            "extras"
        );
        assert_eq!(
            analyze("Movies/The.Matrix.1999.mkv").cover_query(),
            "the matrix 1999"
        );
    }

    #[test]
    fn test_episode_title() {
        assert_eq!(
            analyze("TV/Foo/Season 1/foo.s01e03.mkv").title(),
            "Foo S01E03"
        );
        assert_eq!(analyze("TV/Foo/Season 1/Pilot.mkv").title(), "Pilot");
    }

    #[test]
    fn test_series_before_sagas_and_sorted() {
        let result = names(&[
            "Movies/Zeta/z.mkv",
            "Movies/Alpha/[1] a.mkv",
            "Movies/Alpha/[2] b.mkv",
            "TV/Bar/Season 2/x.S02E01.mkv",
            "TV/Bar/Season 1/x.S01E01.mkv",
            "TV/Abc/Season 1/y.S01E01.mkv",
        ]);
        assert_eq!(
            result,
            vec![
                "abc_s01.json",
                "bar_s01.json",
                "bar_s02.json",
                "saga_alpha.json",
                "z.json"
            ]
        );
    }

    #[test]
    fn test_in_run_collisions_are_suffixed() {
        // Single-movie sagas named after identical titles.
        let result = names(&["A/Movie.mkv", "B/Movie.mkv", "C/Movie.mkv"]);
        assert_eq!(result, vec!["movie.json", "movie_2.json", "movie_3.json"]);
    }

    #[test]
    fn test_missing_episode_numbers_sort_last() {
        let paths: Vec<String> = vec![
            "TV/Foo/Season 1/bonus.mkv".into(),
            "TV/Foo/Season 1/Foo.S01E10.mkv".into(),
            "TV/Foo/Season 1/Foo.S01E02.mkv".into(),
        ];
        let groups = classify(paths, |p| p.as_str());
        assert_eq!(
            groups[0].entries,
            vec![
                "TV/Foo/Season 1/Foo.S01E02.mkv",
                "TV/Foo/Season 1/Foo.S01E10.mkv",
                "TV/Foo/Season 1/bonus.mkv",
            ]
        );
    }

    #[test]
    fn test_unnumbered_movies_sort_after_numbered() {
        let paths: Vec<String> = vec![
            "Saga/Spinoff.mkv".into(),
            "Saga/Part 2.mkv".into(),
            "Saga/01 First.mkv".into(),
        ];
        let groups = classify(paths, |p| p.as_str());
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].entries,
            vec!["Saga/01 First.mkv", "Saga/Part 2.mkv", "Saga/Spinoff.mkv"]
        );
    }
}
