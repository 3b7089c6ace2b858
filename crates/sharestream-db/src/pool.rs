//! Database connection pool management.
//!
//! This module provides connection pooling for SQLite using r2d2.
//! It handles pool initialization, connection customization, and running migrations.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use sharestream_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a new database pool with the given file path.
///
/// Creates the SQLite file if it doesn't exist, enables WAL journaling and
/// runs pending migrations.
///
/// # Example
///
/// ```no_run
/// use sharestream_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/sharestream/db.sqlite").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
    });

    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

/// Initialize an in-memory database pool for testing.
///
/// Every SQLite `:memory:` connection is its own database, so the pool holds
/// a single connection. Callers must not hold a connection across another
/// `get`.
///
/// ```
/// use sharestream_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();

    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

fn migrate(pool: &DbPool) -> Result<()> {
    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {}", e)))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

    Ok(())
}

/// Get a connection from the pool.
///
/// This is a convenience wrapper around `pool.get()` that converts the
/// r2d2 error into our common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_memory_pool() {
        let pool = init_memory_pool().unwrap();
        assert_eq!(pool.max_size(), 1);
        let conn = get_conn(&pool).unwrap();
        let version: usize = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, migrations::latest_version());
    }

    #[test]
    fn test_init_file_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let pool = init_pool(path.to_str().unwrap()).unwrap();
        drop(pool);

        // Reopening an existing database applies nothing new
        let pool = init_pool(path.to_str().unwrap()).unwrap();
        let conn = get_conn(&pool).unwrap();
        assert_eq!(
            migrations::current_version(&conn).unwrap(),
            migrations::latest_version()
        );
    }
}
