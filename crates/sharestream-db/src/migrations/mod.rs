//! Database migrations module
//!
//! This module handles SQLite database schema migrations for sharestream.
//! Migrations are embedded in the binary and executed in order.

use rusqlite::{Connection, Result};
use thiserror::Error;

/// Migration error types
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration {0} failed: {1}")]
    Failed(usize, String),
}

/// A single migration with its SQL content
struct Migration {
    version: usize,
    name: &'static str,
    sql: &'static str,
}

/// All available migrations
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial",
    sql: include_str!("001_initial.sql"),
}];

fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;
    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<usize> {
    conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
        row.get::<_, Option<usize>>(0)
    })
    .map(|v| v.unwrap_or(0))
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<(), MigrationError> {
    conn.execute_batch(migration.sql)
        .map_err(|e| MigrationError::Failed(migration.version, e.to_string()))?;

    conn.execute(
        "INSERT INTO schema_migrations (version, name) VALUES (?, ?)",
        rusqlite::params![migration.version, migration.name],
    )
    .map_err(|e| MigrationError::Failed(migration.version, e.to_string()))?;

    Ok(())
}

/// Run all pending migrations, each inside its own transaction.
///
/// Returns the number of migrations applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    init_migrations_table(conn).map_err(MigrationError::Database)?;

    let current_version = get_current_version(conn).map_err(MigrationError::Database)?;

    let pending_migrations: Vec<_> = MIGRATIONS
        .iter()
        .filter(|m| m.version > current_version)
        .collect();

    let mut applied_count = 0;
    for migration in pending_migrations {
        let tx = conn
            .unchecked_transaction()
            .map_err(MigrationError::Database)?;

        apply_migration(&tx, migration)?;

        tx.commit()
            .map_err(|e| MigrationError::Failed(migration.version, e.to_string()))?;

        applied_count += 1;

        tracing::debug!(
            version = migration.version,
            name = migration.name,
            "Applied migration"
        );
    }

    Ok(applied_count)
}

/// Get the current schema version without applying migrations
pub fn current_version(conn: &Connection) -> Result<usize, MigrationError> {
    init_migrations_table(conn).map_err(MigrationError::Database)?;

    get_current_version(conn).map_err(MigrationError::Database)
}

/// Get the latest available migration version
pub fn latest_version() -> usize {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
