//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - playlists: Imported playlist records keyed by file name
//! - vault: Sealed credential rows and vault metadata

pub mod playlists;
pub mod vault;
