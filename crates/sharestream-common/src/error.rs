//! Common error types used throughout sharestream.
//!
//! This module provides a unified error type that covers common failure cases
//! such as not found, unauthorized access, database errors, remote share
//! failures and I/O failures.

/// Common error type for sharestream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested item was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No credentials are available for the requested server.
    #[error("Unauthorized")]
    Unauthorized,

    /// The requested path lies outside the permitted root.
    #[error("Forbidden")]
    Forbidden,

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sealing or opening a vault value failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// A remote share could not be reached, authenticated or opened.
    #[error("Remote share error: {0}")]
    Remote(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Crypto error.
    pub fn crypto<S: Into<String>>(msg: S) -> Self {
        Self::Crypto(msg.into())
    }

    /// Create a new Remote error.
    pub fn remote<S: Into<String>>(msg: S) -> Self {
        Self::Remote(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
