//! Sharestream-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across sharestream:
//!
//! - **Typed IDs**: `ServerId`, the stable identity of a share server endpoint
//! - **Core Types**: playlist and video item records, credentials, discovered servers
//! - **Path Utilities**: Functions to detect video files by extension
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use sharestream_common::{ServerId, Error, Result};
//! use sharestream_common::paths::is_video_name;
//!
//! let id = ServerId::from_endpoint("nas.local", 445);
//! assert_eq!(id, ServerId::from_endpoint("NAS.local", 445));
//!
//! assert!(is_video_name("movie.mkv"));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("server"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
