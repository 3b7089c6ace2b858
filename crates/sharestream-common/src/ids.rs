//! Typed identifiers.
//!
//! A [`ServerId`] is derived from a server's `host:port` so that the same
//! endpoint always maps to the same vault entry, and playable URLs can carry
//! the id alone.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the hex-encoded server id.
const SERVER_ID_LEN: usize = 16;

/// Stable identifier for a share server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    /// Derive the id for `host:port`. Host comparison is case-insensitive.
    #[must_use]
    pub fn from_endpoint(host: &str, port: u16) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(host.trim().to_ascii_lowercase().as_bytes());
        hasher.update(b":");
        hasher.update(port.to_string().as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..SERVER_ID_LEN].to_string())
    }

    /// Wrap an id taken from a URL or database row.
    ///
    /// Returns `None` unless the value has the shape produced by
    /// [`ServerId::from_endpoint`].
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == SERVER_ID_LEN
            && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
