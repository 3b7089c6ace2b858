//! # sharestream-parser
//!
//! Path-based classification of video libraries into playlists.
//!
//! Episodes are recognised by their season folder and grouped per
//! `(series, season)`; everything else is a movie grouped into a saga named
//! after its parent folder. Grouping is deterministic: the same set of
//! paths always yields the same playlist names and ordering.
//!
//! ## Quick Start
//!
//! ```
//! use sharestream_parser::{classify, GroupKind};
//!
//! let paths = vec![
//!     "/Movies/Saga/[2] B.mkv".to_string(),
//!     "/Movies/Saga/[1] A.mkv".to_string(),
//! ];
//!
//! let groups = classify(paths, |p| p.as_str());
//! assert_eq!(groups[0].file_name, "saga_saga.json");
//! assert!(matches!(groups[0].kind, GroupKind::Saga { .. }));
//! assert!(groups[0].entries[0].ends_with("A.mkv"));
//! ```

pub mod classify;
pub mod matchers;
pub mod naming;
pub mod normalize;

pub use classify::{analyze, classify, GroupKind, MediaKind, PathAnalysis, PlaylistGroup};
pub use naming::unique_name;
pub use normalize::normalize;
