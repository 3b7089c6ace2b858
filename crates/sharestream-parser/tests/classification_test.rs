//! End-to-end classification scenarios over realistic library layouts.

use sharestream_parser::{analyze, classify, GroupKind, MediaKind, PlaylistGroup};

fn run(paths: &[&str]) -> Vec<PlaylistGroup<String>> {
    classify(
        paths.iter().map(|p| p.to_string()).collect(),
        |p: &String| p.as_str(),
    )
}

fn names(groups: &[PlaylistGroup<String>]) -> Vec<&str> {
    groups.iter().map(|g| g.file_name.as_str()).collect()
}

#[test]
fn test_season_folder_groups_and_orders_episodes() {
    let groups = run(&[
        "Shows/Foo/Season 1/Foo.S01E02.mkv",
        "Shows/Foo/Season 1/Foo.S01E01.mkv",
    ]);

    assert_eq!(names(&groups), vec!["foo_s01.json"]);
    assert_eq!(
        groups[0].kind,
        GroupKind::Series {
            series: "foo".into(),
            season: 1
        }
    );
    assert_eq!(
        groups[0].entries,
        vec![
            "Shows/Foo/Season 1/Foo.S01E01.mkv",
            "Shows/Foo/Season 1/Foo.S01E02.mkv",
        ]
    );
}

#[test]
fn test_bracketed_saga_order() {
    let groups = run(&["/Movies/Saga/[2] B.mkv", "/Movies/Saga/[1] A.mkv"]);

    assert_eq!(names(&groups), vec!["saga_saga.json"]);
    assert_eq!(
        groups[0].entries,
        vec!["/Movies/Saga/[1] A.mkv", "/Movies/Saga/[2] B.mkv"]
    );
}

#[test]
fn test_part_folder_resolves_to_grandparent_saga() {
    let analysis = analyze(".../Trilogy/Part 2/Movie.mkv");
    match analysis.kind {
        MediaKind::Movie { saga_display, .. } => assert_eq!(saga_display, "Trilogy"),
        other => panic!("expected movie, got {other:?}"),
    }

    let groups = run(&[
        "Movies/Trilogy/Part 1/First.mkv",
        "Movies/Trilogy/Part 2/Second.mkv",
    ]);
    assert_eq!(names(&groups), vec!["saga_trilogy.json"]);
    assert_eq!(groups[0].entries.len(), 2);
}

#[test]
fn test_mixed_library() {
    let groups = run(&[
        "TV/Dark/Temporada 2/Dark 2x01.mkv",
        "TV/Dark/Temporada 1/Dark 1x02.mkv",
        "TV/Dark/Temporada 1/Dark 1x01.mkv",
        "Movies/Alien/Alien.mkv",
        "Movies/Alien/Aliens.mkv",
        "Loose.mkv",
    ]);

    assert_eq!(
        names(&groups),
        vec![
            "dark_s01.json",
            "dark_s02.json",
            "saga_alien.json",
            "loose.json",
        ]
    );
    assert!(groups[0].entries[0].ends_with("1x01.mkv"));
    assert_eq!(
        groups[3].kind,
        GroupKind::Saga {
            saga: "movies".into()
        }
    );
}

#[test]
fn test_classification_is_idempotent() {
    let paths = [
        "Shows/Bar/S2/bar.s02e03.mkv",
        "Shows/Bar/S2/bar.s02e01.mkv",
        "Movies/Heat.mkv",
        "Movies/Rocky/Rocky II.mkv",
        "Movies/Rocky/Rocky.mkv",
    ];

    let first = run(&paths);
    let mut reversed = paths;
    reversed.reverse();
    let second = run(&reversed);

    assert_eq!(first, second);
}

#[test]
fn test_episode_titles_and_cover_queries() {
    let analysis = analyze("Shows/The Office/Season 3/The.Office.S03E07.mkv");
    assert_eq!(analysis.title(), "The Office S03E07");
    assert_eq!(analysis.cover_query(), "the office s03 07");
}
