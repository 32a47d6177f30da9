//! Metadata sources.
//!
//! A [`MetadataSource`] turns provider responses into normalized [`Movie`] and
//! [`Genre`] values. Not-found answers come back as `Ok(None)`; every other
//! failure is a [`SourceError`]. Sources own no caches.

pub mod payload;
pub mod tmdb;

use async_trait::async_trait;
use thiserror::Error;

use crate::movie::{Genre, Movie, MovieId, TimeWindow};

pub use tmdb::{TmdbClient, TmdbSettings};

/// Language tag used when a localized trailer lookup finds nothing.
pub const FALLBACK_LANGUAGE: &str = "en-US";

/// Errors raised while talking to the metadata provider.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Non-success, non-404 answer from the provider.
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// The provider could not be reached or did not answer in time.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A record lacks a field the domain model requires.
    #[error("malformed provider data: {0}")]
    MalformedData(String),
}

/// Read-only access to the movie metadata provider.
///
/// Every method issues a single request, except [`movie_trailer`] which may
/// retry once in [`FALLBACK_LANGUAGE`].
///
/// [`movie_trailer`]: MetadataSource::movie_trailer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// First title-search hit for `query`.
    async fn search(&self, query: &str, language: &str) -> Result<Option<Movie>, SourceError>;

    /// Trending movies for `window`, in provider order.
    async fn trending(
        &self,
        window: TimeWindow,
        language: &str,
    ) -> Result<Option<Vec<Movie>>, SourceError>;

    async fn movie_by_id(&self, id: MovieId, language: &str)
        -> Result<Option<Movie>, SourceError>;

    /// URL of the best official trailer, if any.
    async fn movie_trailer(&self, id: MovieId, language: &str)
        -> Result<Option<String>, SourceError>;

    /// Full genre list. Entries without an id or name are dropped.
    async fn genres(&self, language: &str) -> Result<Vec<Genre>, SourceError>;
}

/// Whether `language` already targets English, so a fallback lookup is pointless.
pub fn is_english(language: &str) -> bool {
    let primary = language.split(['-', '_']).next().unwrap_or_default();
    primary.eq_ignore_ascii_case("en")
}
