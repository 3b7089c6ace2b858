//! Playlist database queries.
//!
//! Playlists are keyed by file name. Rows hold the video list as raw JSON;
//! decoding (and legacy field handling) is left to the caller so that a
//! corrupt row never prevents the others from loading.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use sharestream_common::{Error, Result};

use crate::models::PlaylistRow;

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlaylistRow> {
    let created_at: String = row.get(2)?;
    let updated_at: String = row.get(3)?;
    Ok(PlaylistRow {
        file_name: row.get(0)?,
        videos: row.get(1)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Insert a playlist unless one with the same name exists.
///
/// Returns `true` when a row was inserted.
pub fn insert_if_absent(conn: &Connection, file_name: &str, videos_json: &str) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO playlists (file_name, videos, created_at, updated_at)
             VALUES (:file_name, :videos, :now, :now)",
            rusqlite::named_params! {
                ":file_name": file_name,
                ":videos": videos_json,
                ":now": now,
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(inserted == 1)
}

/// Replace the playlist with the given name, creating it if needed.
pub fn upsert(conn: &Connection, file_name: &str, videos_json: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO playlists (file_name, videos, created_at, updated_at)
         VALUES (:file_name, :videos, :now, :now)
         ON CONFLICT(file_name) DO UPDATE SET
            videos = excluded.videos,
            updated_at = excluded.updated_at",
        rusqlite::named_params! {
            ":file_name": file_name,
            ":videos": videos_json,
            ":now": now,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Delete a playlist. Returns `true` if it existed.
pub fn delete(conn: &Connection, file_name: &str) -> Result<bool> {
    let deleted = conn
        .execute(
            "DELETE FROM playlists WHERE file_name = :file_name",
            rusqlite::named_params! { ":file_name": file_name },
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(deleted > 0)
}

/// Delete every playlist. Returns the number of rows removed.
pub fn delete_all(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM playlists", [])
        .map_err(|e| Error::database(e.to_string()))
}

/// Check whether a playlist with this name exists.
pub fn exists(conn: &Connection, file_name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM playlists WHERE file_name = :file_name)",
        rusqlite::named_params! { ":file_name": file_name },
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Get a single playlist row.
pub fn get(conn: &Connection, file_name: &str) -> Result<Option<PlaylistRow>> {
    conn.query_row(
        "SELECT file_name, videos, created_at, updated_at
         FROM playlists WHERE file_name = :file_name",
        rusqlite::named_params! { ":file_name": file_name },
        map_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all playlist rows in insertion order.
pub fn list(conn: &Connection) -> Result<Vec<PlaylistRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT file_name, videos, created_at, updated_at
             FROM playlists ORDER BY rowid",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([], map_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(rows)
}

/// List the names of all playlists in insertion order.
pub fn list_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT file_name FROM playlists ORDER BY rowid")
        .map_err(|e| Error::database(e.to_string()))?;

    let names = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(names)
}
