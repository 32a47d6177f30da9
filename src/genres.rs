use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

use crate::{
    movie::Genre,
    sources::{MetadataSource, SourceError},
    storage::{MovieStore, StorageError},
};

#[derive(Debug, Error)]
pub enum GenreLoadError {
    #[error("genre list could not be fetched: {0}")]
    Source(#[from] SourceError),

    #[error("genre list could not be stored: {0}")]
    Storage(#[from] StorageError),

    #[error("provider returned no usable genres")]
    Empty,
}

/// Genre id → display name, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct GenreTable {
    names: HashMap<u64, String>,
}

impl GenreTable {
    /// Builds a table from `genres`. An empty list is an error: the table is
    /// never allowed to stay silently empty.
    pub fn from_genres(genres: impl IntoIterator<Item = Genre>) -> Result<Self, GenreLoadError> {
        let names: HashMap<u64, String> = genres.into_iter().map(|g| (g.id, g.name)).collect();
        if names.is_empty() {
            return Err(GenreLoadError::Empty);
        }
        Ok(Self { names })
    }

    /// Fetches the provider's genre list, persists it, and builds the table.
    pub async fn preload(
        source: &dyn MetadataSource,
        store: &dyn MovieStore,
        language: &str,
    ) -> Result<Self, GenreLoadError> {
        let genres = source.genres(language).await?;
        if genres.is_empty() {
            return Err(GenreLoadError::Empty);
        }

        store.upsert_genres(&genres).await?;
        let table = Self::from_genres(genres)?;
        info!("🏷️ {} géneros cargados ({})", table.len(), language);
        Ok(table)
    }

    pub fn name_or<'a>(&'a self, id: u64, default: &'a str) -> &'a str {
        self.names.get(&id).map(String::as_str).unwrap_or(default)
    }

    /// Comma-separated names for `ids`, in order.
    pub fn names(&self, ids: &[u64], default: &str) -> String {
        ids.iter()
            .map(|id| self.name_or(*id, default))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
