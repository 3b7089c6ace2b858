//! Internal Rust models matching the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw playlist row. `videos` is the undecoded JSON array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistRow {
    pub file_name: String,
    pub videos: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw vault row. `payload` is sealed and opaque to this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaultRow {
    pub server_id: String,
    pub payload: String,
    pub updated_at: DateTime<Utc>,
}
