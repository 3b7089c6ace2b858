//! Sharestream - stream network-share video libraries to a local player
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod covers;
pub mod discovery;
pub mod gateway;
pub mod import;
pub mod login;
pub mod playlists;
pub mod share;
pub mod vault;
pub mod walker;
