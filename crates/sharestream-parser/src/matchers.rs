//! Ordered pattern matchers.
//!
//! Each family is a list of matchers tried in priority order; the first one
//! that returns `Some` wins. All matchers are pure functions over a single
//! path segment.

use std::sync::LazyLock;

use regex::Regex;

use crate::normalize::normalize;

/// A named matcher in a priority list.
struct Matcher<T> {
    name: &'static str,
    run: fn(&str) -> Option<T>,
}

fn first_match<T>(matchers: &[Matcher<T>], input: &str) -> Option<(T, &'static str)> {
    matchers
        .iter()
        .find_map(|m| (m.run)(input).map(|value| (value, m.name)))
}

fn capture_u32(caps: &regex::Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

// ---------------------------------------------------------------------------
// Season folders
// ---------------------------------------------------------------------------

static SEASON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:temporada|temp|season|s)[\s._-]*(\d{1,3})$").expect("valid regex")
});

static SEASON_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})$").expect("valid regex"));

fn single(re: &Regex, input: &str) -> Option<u32> {
    re.captures(input).and_then(|c| capture_u32(&c, 1))
}

fn season_word(s: &str) -> Option<u32> {
    single(&SEASON_WORD, s)
}

fn season_bare(s: &str) -> Option<u32> {
    single(&SEASON_BARE, s)
}

const SEASON_FOLDER_MATCHERS: &[Matcher<u32>] = &[
    Matcher {
        name: "season-word",
        run: season_word,
    },
    Matcher {
        name: "season-bare",
        run: season_bare,
    },
];

/// Season number of a folder name such as `Season 2`, `Temporada 03`,
/// `S1` or `4`.
///
/// ```
/// use sharestream_parser::matchers::season_folder;
///
/// assert_eq!(season_folder("Season 1"), Some(1));
/// assert_eq!(season_folder("temporada_02"), Some(2));
/// assert_eq!(season_folder("Temp3"), Some(3));
/// assert_eq!(season_folder("07"), Some(7));
/// assert_eq!(season_folder("Specials"), None);
/// ```
pub fn season_folder(folder: &str) -> Option<u32> {
    first_match(SEASON_FOLDER_MATCHERS, folder.trim()).map(|(season, _)| season)
}

// ---------------------------------------------------------------------------
// Season/episode in file names
// ---------------------------------------------------------------------------

static EPISODE_SXXEYY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])s(\d{1,2})[\s._-]*e(\d{1,3})").expect("valid regex")
});

static EPISODE_NXM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z])(\d{1,2})x(\d{1,3})(?:$|[^0-9])").expect("valid regex")
});

static EPISODE_LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])s(\d{1,2})[^0-9]{1,3}(\d{1,3})(?:$|[^0-9p])")
        .expect("valid regex")
});

fn pair(re: &Regex, input: &str) -> Option<(u32, u32)> {
    let caps = re.captures(input)?;
    Some((capture_u32(&caps, 1)?, capture_u32(&caps, 2)?))
}

fn episode_sxxeyy(s: &str) -> Option<(u32, u32)> {
    pair(&EPISODE_SXXEYY, s)
}

fn episode_nxm(s: &str) -> Option<(u32, u32)> {
    pair(&EPISODE_NXM, s)
}

fn episode_loose(s: &str) -> Option<(u32, u32)> {
    pair(&EPISODE_LOOSE, s)
}

const EPISODE_MATCHERS: &[Matcher<(u32, u32)>] = &[
    Matcher {
        name: "sxxeyy",
        run: episode_sxxeyy,
    },
    Matcher {
        name: "nxm",
        run: episode_nxm,
    },
    Matcher {
        name: "loose",
        run: episode_loose,
    },
];

/// Parse `(season, episode)` from a file name.
///
/// Patterns, in priority order: `S01E02`, `1x02`, then a loose `S1.2`.
///
/// ```
/// use sharestream_parser::matchers::season_episode;
///
/// assert_eq!(season_episode("Show.S01E02.mkv"), Some((1, 2)));
/// assert_eq!(season_episode("Show.1x02.mkv"), Some((1, 2)));
/// assert_eq!(season_episode("Show.S1.2.mkv"), Some((1, 2)));
/// assert_eq!(season_episode("Movie.2010.mkv"), None);
/// ```
pub fn season_episode(file_name: &str) -> Option<(u32, u32)> {
    season_episode_with_rule(file_name).map(|(pair, _)| pair)
}

/// Like [`season_episode`] but also names the matcher that fired.
pub fn season_episode_with_rule(file_name: &str) -> Option<((u32, u32), &'static str)> {
    first_match(EPISODE_MATCHERS, file_name)
}

// ---------------------------------------------------------------------------
// Part/volume folders
// ---------------------------------------------------------------------------

static PART_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:i|ii|iii|iv|v|vi|\d{1,2})$").expect("valid regex"));

/// Whether a folder name is a part/volume marker rather than a saga name.
///
/// ```
/// use sharestream_parser::matchers::is_part_marker;
///
/// assert!(is_part_marker("Part 2"));
/// assert!(is_part_marker("Parte I"));
/// assert!(is_part_marker("III"));
/// assert!(is_part_marker("12"));
/// assert!(!is_part_marker("Trilogy"));
/// ```
pub fn is_part_marker(folder: &str) -> bool {
    let normalized = normalize(folder);
    PART_MARKER.is_match(&normalized) || normalized.contains("part")
}

// ---------------------------------------------------------------------------
// Movie ordering keys
// ---------------------------------------------------------------------------

static ORDER_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{1,3})\]").expect("valid regex"));

static ORDER_LEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,3})(?:[\s._-]|$)").expect("valid regex"));

static ORDER_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])parte?[\s._-]*(\d{1,3})(?:$|[^0-9])").expect("valid regex")
});

fn order_bracket(s: &str) -> Option<u32> {
    single(&ORDER_BRACKET, s)
}

fn order_leading(s: &str) -> Option<u32> {
    single(&ORDER_LEADING, s)
}

fn order_part(s: &str) -> Option<u32> {
    single(&ORDER_PART, s)
}

const ORDER_MATCHERS: &[Matcher<u32>] = &[
    Matcher {
        name: "bracket",
        run: order_bracket,
    },
    Matcher {
        name: "leading",
        run: order_leading,
    },
    Matcher {
        name: "part",
        run: order_part,
    },
];

/// Explicit position of a movie inside its saga, taken from its file stem.
///
/// `None` means "no marker"; such movies sort after every numbered one.
///
/// ```
/// use sharestream_parser::matchers::order_key;
///
/// assert_eq!(order_key("[2] The Two Towers"), Some(2));
/// assert_eq!(order_key("03 - Return of the King"), Some(3));
/// assert_eq!(order_key("Kill Bill Part 1"), Some(1));
/// assert_eq!(order_key("2001 A Space Odyssey"), None);
/// ```
pub fn order_key(stem: &str) -> Option<u32> {
    first_match(ORDER_MATCHERS, stem).map(|(key, _)| key)
}
