//! Cover provider backends.

mod service;
mod tmdb;

pub use service::ServiceProvider;
pub use tmdb::TmdbProvider;
