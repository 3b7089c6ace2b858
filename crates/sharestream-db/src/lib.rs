//! Sharestream-DB: Database schema, migrations, and query operations
//!
//! This crate provides persistence for sharestream using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use sharestream_db::pool::{init_pool, get_conn};
//! use sharestream_db::queries::playlists;
//!
//! let pool = init_pool("/var/lib/sharestream/db.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let names = playlists::list_names(&conn).unwrap();
//! println!("{} playlists", names.len());
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
