//! Playable URL construction and request path decoding.
//!
//! Every path segment is percent-encoded on its own, so names containing
//! `%`, `#` or spaces survive the round trip through the player. On the
//! way back in, a decoded segment may not smuggle in a path separator.

use std::path::{Component, Path};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is inside a segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

fn encode_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// `http://127.0.0.1:{port}/share/{server_id}/{share}/{path...}`
pub fn share_url(port: u16, server_id: &str, share: &str, path: &str) -> String {
    format!(
        "http://127.0.0.1:{}/share/{}/{}/{}",
        port,
        encode_segment(server_id),
        encode_segment(share),
        encode_path(path.split('/'))
    )
}

/// `http://127.0.0.1:{port}/{absolute path...}`
pub fn local_url(port: u16, path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!(
        "http://127.0.0.1:{}/{}",
        port,
        encode_path(segments.iter().map(String::as_str))
    )
}

/// Split a raw request path on `/` and decode each segment separately.
///
/// Returns `None` if a decoded segment is not valid UTF-8, contains `/` or
/// `\\`, or is `.` or `..`.
pub fn decode_segments(raw_path: &str) -> Option<Vec<String>> {
    raw_path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            let decoded = percent_decode_str(s).decode_utf8().ok()?;
            is_plain_segment(&decoded).then(|| decoded.into_owned())
        })
        .collect()
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.contains(['/', '\\']) && segment != "." && segment != ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_share_url_encodes_segments() {
        let url = share_url(8989, "0123456789abcdef", "My Share", "Shows/Foo #1/Season 1/a b.mkv");
        assert_eq!(
            url,
            "http://127.0.0.1:8989/share/0123456789abcdef/My%20Share/Shows/Foo%20%231/Season%201/a%20b.mkv"
        );
    }

    #[test]
    fn test_decode_is_per_segment() {
        let decoded = decode_segments("/share/id/My%20Share/a%23b/c%25.mkv").unwrap();
        assert_eq!(decoded, vec!["share", "id", "My Share", "a#b", "c%.mkv"]);
        assert!(decode_segments("/bad/%FF").is_none());
    }

    #[test]
    fn test_decode_rejects_separators_and_dots() {
        assert!(decode_segments("/share/id/Media/Movies%2Fa.mp4").is_none());
        assert!(decode_segments("/share/id/Media/Movies%5Ca.mp4").is_none());
        assert!(decode_segments("/share/id/Media/Movies\\a.mp4").is_none());
        assert!(decode_segments("/share/id/Media/%2E%2E/a.mp4").is_none());
        assert!(decode_segments("/share/id/Media/./a.mp4").is_none());
        assert!(decode_segments("/share/id/Media/..a.mp4").is_some());
    }

    #[test]
    fn test_local_url_round_trip() {
        let path = PathBuf::from("/media/Movies/Ünïcode film.mkv");
        let url = local_url(8990, &path);
        let raw = url.trim_start_matches("http://127.0.0.1:8990");
        assert_eq!(
            decode_segments(raw).unwrap(),
            vec!["media", "Movies", "Ünïcode film.mkv"]
        );
    }
}
