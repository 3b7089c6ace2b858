//! Vault database queries.
//!
//! Rows store sealed payloads only. The `server_id` primary key doubles as
//! the index of known servers, so registering a server and writing its
//! credentials is a single statement.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use sharestream_common::{Error, Result};

use crate::models::VaultRow;

/// Insert or replace the sealed credential payload for a server.
pub fn put_entry(conn: &Connection, server_id: &str, payload: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO vault_entries (server_id, payload, updated_at)
         VALUES (:server_id, :payload, :updated_at)
         ON CONFLICT(server_id) DO UPDATE SET
            payload = excluded.payload,
            updated_at = excluded.updated_at",
        rusqlite::named_params! {
            ":server_id": server_id,
            ":payload": payload,
            ":updated_at": Utc::now().to_rfc3339(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get the sealed credential row for a server.
pub fn get_entry(conn: &Connection, server_id: &str) -> Result<Option<VaultRow>> {
    conn.query_row(
        "SELECT server_id, payload, updated_at FROM vault_entries WHERE server_id = :server_id",
        rusqlite::named_params! { ":server_id": server_id },
        |row| {
            let updated_at: String = row.get(2)?;
            Ok(VaultRow {
                server_id: row.get(0)?,
                payload: row.get(1)?,
                updated_at: DateTime::parse_from_rfc3339(&updated_at)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_default(),
            })
        },
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all known server ids, sorted.
pub fn list_server_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT server_id FROM vault_entries ORDER BY server_id")
        .map_err(|e| Error::database(e.to_string()))?;

    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<String>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(ids)
}

/// Insert or replace a sealed metadata value.
pub fn put_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO vault_meta (key, value) VALUES (:key, :value)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::named_params! { ":key": key, ":value": value },
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Get a sealed metadata value.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM vault_meta WHERE key = :key",
        rusqlite::named_params! { ":key": key },
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Remove every vault entry and metadata value. Returns the number of
/// credential rows removed.
pub fn clear(conn: &Connection) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;
    let removed = tx
        .execute("DELETE FROM vault_entries", [])
        .map_err(|e| Error::database(e.to_string()))?;
    tx.execute("DELETE FROM vault_meta", [])
        .map_err(|e| Error::database(e.to_string()))?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(removed)
}
