//! Core record types shared between the parser, database and server crates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::ids::ServerId;

/// Legacy JSON keys and the canonical key each one maps to.
///
/// Playlists saved by earlier releases used the left-hand names.
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("skip", "skipToSecond"),
    ("delaySkip", "delaySeconds"),
    ("imgSml", "cardImageUrl"),
    ("imgBig", "backgroundImageUrl"),
    ("videoSrc", "videoUrl"),
];

/// A playable entry inside a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoItem {
    #[serde(default)]
    pub title: String,

    /// Second at which playback should start (intro skip).
    #[serde(rename = "skipToSecond", default)]
    pub skip_seconds: u32,

    #[serde(rename = "delaySeconds", default)]
    pub delay_seconds: u32,

    #[serde(rename = "cardImageUrl", default)]
    pub poster_url: String,

    #[serde(rename = "backgroundImageUrl", default)]
    pub background_url: String,

    #[serde(rename = "videoUrl")]
    pub playable_url: String,
}

impl VideoItem {
    /// Decode one item from raw JSON, accepting legacy field names.
    pub fn from_json_value(value: Value) -> Result<Self> {
        let value = match value {
            Value::Object(map) => Value::Object(apply_legacy_aliases(map)),
            other => other,
        };
        let item: VideoItem = serde_json::from_value(value)
            .map_err(|e| Error::invalid_input(format!("invalid video item: {e}")))?;
        if item.playable_url.trim().is_empty() {
            return Err(Error::invalid_input("video item has an empty video URL"));
        }
        Ok(item)
    }
}

/// Rename legacy keys to their canonical names.
///
/// When both the legacy and canonical key are present, the canonical value
/// is kept.
pub fn apply_legacy_aliases(mut map: Map<String, Value>) -> Map<String, Value> {
    for (legacy, canonical) in LEGACY_ALIASES {
        if let Some(value) = map.remove(*legacy) {
            map.entry(canonical.to_string()).or_insert(value);
        }
    }
    map
}

/// Decode a JSON array of video items, accepting legacy field names.
pub fn parse_video_list(json: &str) -> Result<Vec<VideoItem>> {
    let raw: Value = serde_json::from_str(json)
        .map_err(|e| Error::invalid_input(format!("invalid playlist JSON: {e}")))?;
    match raw {
        Value::Array(values) => values.into_iter().map(VideoItem::from_json_value).collect(),
        _ => Err(Error::invalid_input("playlist JSON is not an array")),
    }
}

/// A named, ordered collection of videos. The file name is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub videos: Vec<VideoItem>,
}

impl Playlist {
    pub fn new(file_name: impl Into<String>, videos: Vec<VideoItem>) -> Self {
        Self {
            file_name: file_name.into(),
            videos,
        }
    }
}

/// Login material for one share server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCredentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub domain: Option<String>,
}

impl std::fmt::Debug for ShareCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Network address of a share server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn server_id(&self) -> ServerId {
        ServerId::from_endpoint(&self.host, self.port)
    }
}

impl std::fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A share server found on the LAN. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredServer {
    pub id: ServerId,
    pub display_name: String,
    pub host: String,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_item_canonical_keys() {
        let item = VideoItem {
            title: "Pilot".into(),
            skip_seconds: 30,
            delay_seconds: 0,
            poster_url: "p".into(),
            background_url: "b".into(),
            playable_url: "http://127.0.0.1/x".into(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["skipToSecond"], 30);
        assert_eq!(value["cardImageUrl"], "p");
        assert_eq!(value["backgroundImageUrl"], "b");
        assert_eq!(value["videoUrl"], "http://127.0.0.1/x");
    }

    #[test]
    fn test_legacy_aliases_are_accepted() {
        let raw = json!({
            "title": "Old",
            "skip": 12,
            "delaySkip": 3,
            "imgSml": "small.jpg",
            "imgBig": "big.jpg",
            "videoSrc": "http://host/video.mkv"
        });
        let item = VideoItem::from_json_value(raw).unwrap();
        assert_eq!(item.skip_seconds, 12);
        assert_eq!(item.delay_seconds, 3);
        assert_eq!(item.poster_url, "small.jpg");
        assert_eq!(item.background_url, "big.jpg");
        assert_eq!(item.playable_url, "http://host/video.mkv");
    }

    #[test]
    fn test_canonical_key_wins_over_legacy() {
        let raw = json!({
            "skip": 1,
            "skipToSecond": 2,
            "videoUrl": "http://a",
            "videoSrc": "http://b"
        });
        let item = VideoItem::from_json_value(raw).unwrap();
        assert_eq!(item.skip_seconds, 2);
        assert_eq!(item.playable_url, "http://a");
    }

    #[test]
    fn test_empty_video_url_rejected() {
        let raw = json!({ "title": "x", "videoUrl": "  " });
        assert!(VideoItem::from_json_value(raw).is_err());
    }

    #[test]
    fn test_parse_video_list() {
        let json = r#"[{"title":"a","videoSrc":"http://a"},{"title":"b","videoUrl":"http://b"}]"#;
        let items = parse_video_list(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].playable_url, "http://a");
        assert!(parse_video_list("{}").is_err());
        assert!(parse_video_list("not json").is_err());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = ShareCredentials {
            username: "alice".into(),
            password: "hunter2".into(),
            domain: None,
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_endpoint_server_id() {
        let endpoint = ServerEndpoint::new("nas", 445);
        assert_eq!(endpoint.server_id(), ServerId::from_endpoint("nas", 445));
        assert_eq!(endpoint.to_string(), "nas:445");
    }
}
