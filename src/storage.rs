//! Durable store for movies, genres and user associations.
//!
//! [`JsonStorage`] keeps everything in memory and mirrors each mutation to a
//! JSON file under the data directory:
//!
//! ```text
//! data/
//! ├── genres.json
//! ├── movies/movie_<id>.json
//! └── users/user_<id>.json
//! ```

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{fs, sync::RwLock};
use tracing::{debug, info, warn};

use crate::movie::{Genre, Movie, MovieId, UserId};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{operation} '{path}': {source}")]
    Io {
        operation: &'static str,
        path: String,
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("movie {0} is not stored")]
    UnknownMovie(MovieId),
}

/// Authoritative record of movies, genres and per-user associations.
///
/// Users are created on first write; reading an unknown user yields empty
/// lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Inserts or replaces movies by id. A stored trailer survives an
    /// upsert that carries none.
    async fn upsert_movies(&self, movies: &[Movie]) -> Result<(), StorageError>;

    async fn movie(&self, id: MovieId) -> Result<Option<Movie>, StorageError>;

    /// Stores a trailer unless one is already present. Returns whether it wrote.
    async fn set_trailer(&self, id: MovieId, url: &str) -> Result<bool, StorageError>;

    async fn upsert_genres(&self, genres: &[Genre]) -> Result<(), StorageError>;

    async fn genres(&self) -> Result<Vec<Genre>, StorageError>;

    async fn favourites(&self, user: UserId) -> Result<Vec<Movie>, StorageError>;

    /// Returns `false` if the movie was already a favourite.
    async fn add_favourite(&self, user: UserId, movie: MovieId) -> Result<bool, StorageError>;

    /// Returns `false` if the movie was not a favourite.
    async fn remove_favourite(&self, user: UserId, movie: MovieId) -> Result<bool, StorageError>;

    async fn last_trending(&self, user: UserId) -> Result<Vec<Movie>, StorageError>;

    /// Clears the user's trending association and adds `movies` in order.
    async fn replace_last_trending(
        &self,
        user: UserId,
        movies: &[MovieId],
    ) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserRecord {
    id: UserId,
    #[serde(default)]
    favourites: Vec<MovieId>,
    #[serde(default)]
    last_trending: Vec<MovieId>,
}

#[derive(Debug, Default)]
struct StoreState {
    movies: HashMap<MovieId, Movie>,
    genres: Vec<Genre>,
    users: HashMap<UserId, UserRecord>,
}

impl StoreState {
    fn resolve(&self, ids: &[MovieId]) -> Vec<Movie> {
        ids.iter()
            .filter_map(|id| self.movies.get(id).cloned())
            .collect()
    }
}

/// Manager de almacenamiento basado en archivos JSON
pub struct JsonStorage {
    data_dir: PathBuf,
    state: RwLock<StoreState>,
}

impl fmt::Debug for JsonStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStorage")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf) -> Result<Self, StorageError> {
        for dir in [data_dir.join("movies"), data_dir.join("users")] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| io_error("create", &dir, e))?;
        }

        info!("📁 Storage inicializado en: {}", data_dir.display());

        let storage = Self {
            data_dir,
            state: RwLock::new(StoreState::default()),
        };
        storage.load_all().await?;

        Ok(storage)
    }

    pub async fn stats(&self) -> StorageStats {
        let state = self.state.read().await;
        StorageStats {
            movies: state.movies.len(),
            genres: state.genres.len(),
            users: state.users.len(),
            data_dir: self.data_dir.clone(),
        }
    }

    // Métodos privados

    async fn load_all(&self) -> Result<(), StorageError> {
        let mut state = self.state.write().await;

        let genres_path = self.genres_path();
        if fs::try_exists(&genres_path).await.unwrap_or(false) {
            state.genres = read_json(&genres_path).await?;
        }

        for movie in load_dir::<Movie>(&self.data_dir.join("movies"), "movie_").await? {
            state.movies.insert(movie.id, movie);
        }
        for user in load_dir::<UserRecord>(&self.data_dir.join("users"), "user_").await? {
            state.users.insert(user.id, user);
        }

        info!(
            "📂 Cargados {} películas, {} géneros y {} usuarios",
            state.movies.len(),
            state.genres.len(),
            state.users.len()
        );
        Ok(())
    }

    fn genres_path(&self) -> PathBuf {
        self.data_dir.join("genres.json")
    }

    fn movie_path(&self, id: MovieId) -> PathBuf {
        self.data_dir.join("movies").join(format!("movie_{}.json", id))
    }

    fn user_path(&self, id: UserId) -> PathBuf {
        self.data_dir.join("users").join(format!("user_{}.json", id))
    }

    async fn save_user(&self, user: &UserRecord) -> Result<(), StorageError> {
        write_json(&self.user_path(user.id), user).await
    }
}

#[async_trait]
impl MovieStore for JsonStorage {
    async fn upsert_movies(&self, movies: &[Movie]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;

        for movie in movies {
            let mut record = movie.clone();
            if let Some(existing) = state.movies.get(&movie.id) {
                if record.trailer.is_none() {
                    record.trailer = existing.trailer.clone();
                }
                if *existing == record {
                    continue;
                }
            }

            write_json(&self.movie_path(record.id), &record).await?;
            state.movies.insert(record.id, record);
        }

        debug!("💾 {} películas guardadas", movies.len());
        Ok(())
    }

    async fn movie(&self, id: MovieId) -> Result<Option<Movie>, StorageError> {
        Ok(self.state.read().await.movies.get(&id).cloned())
    }

    async fn set_trailer(&self, id: MovieId, url: &str) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        let Some(existing) = state.movies.get(&id) else {
            return Err(StorageError::UnknownMovie(id));
        };

        let mut record = existing.clone();
        if !record.set_trailer(url) {
            return Ok(false);
        }

        write_json(&self.movie_path(id), &record).await?;
        state.movies.insert(id, record);
        Ok(true)
    }

    async fn upsert_genres(&self, genres: &[Genre]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;

        let mut merged = state.genres.clone();
        for genre in genres {
            match merged.iter_mut().find(|g| g.id == genre.id) {
                Some(existing) => existing.name = genre.name.clone(),
                None => merged.push(genre.clone()),
            }
        }

        write_json(&self.genres_path(), &merged).await?;
        state.genres = merged;
        Ok(())
    }

    async fn genres(&self) -> Result<Vec<Genre>, StorageError> {
        Ok(self.state.read().await.genres.clone())
    }

    async fn favourites(&self, user: UserId) -> Result<Vec<Movie>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&user)
            .map(|record| state.resolve(&record.favourites))
            .unwrap_or_default())
    }

    async fn add_favourite(&self, user: UserId, movie: MovieId) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        if !state.movies.contains_key(&movie) {
            return Err(StorageError::UnknownMovie(movie));
        }

        let mut record = state.users.get(&user).cloned().unwrap_or(UserRecord {
            id: user,
            ..Default::default()
        });
        if record.favourites.contains(&movie) {
            return Ok(false);
        }
        record.favourites.push(movie);

        self.save_user(&record).await?;
        state.users.insert(user, record);
        Ok(true)
    }

    async fn remove_favourite(&self, user: UserId, movie: MovieId) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        let Some(mut record) = state.users.get(&user).cloned() else {
            return Ok(false);
        };

        let before = record.favourites.len();
        record.favourites.retain(|id| *id != movie);
        if record.favourites.len() == before {
            return Ok(false);
        }

        self.save_user(&record).await?;
        state.users.insert(user, record);
        Ok(true)
    }

    async fn last_trending(&self, user: UserId) -> Result<Vec<Movie>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&user)
            .map(|record| state.resolve(&record.last_trending))
            .unwrap_or_default())
    }

    async fn replace_last_trending(
        &self,
        user: UserId,
        movies: &[MovieId],
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let mut record = state.users.get(&user).cloned().unwrap_or(UserRecord {
            id: user,
            ..Default::default()
        });

        record.last_trending.clear();
        record.last_trending.extend_from_slice(movies);

        self.save_user(&record).await?;
        state.users.insert(user, record);
        Ok(())
    }
}

/// Estadísticas de almacenamiento
#[derive(Debug)]
pub struct StorageStats {
    pub movies: usize,
    pub genres: usize,
    pub users: usize,
    pub data_dir: PathBuf,
}

impl fmt::Display for StorageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "📊 Storage Stats:\n\
             📁 Data Directory: {}\n\
             🎬 Movies: {}\n\
             🏷️ Genres: {}\n\
             👤 Users: {}",
            self.data_dir.display(),
            self.movies,
            self.genres,
            self.users
        )
    }
}

fn io_error(operation: &'static str, path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        operation,
        path: path.display().to_string(),
        source,
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| io_error("read", path, e))?;
    serde_json::from_str(&content).map_err(|source| StorageError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Writes through a temporary sibling so a crash never leaves a torn file.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)
        .await
        .map_err(|e| io_error("write", &tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error("rename", path, e))
}

/// Loads every `<prefix><id>.json` file in `dir`, skipping unreadable ones.
async fn load_dir<T: DeserializeOwned>(dir: &Path, prefix: &str) -> Result<Vec<T>, StorageError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| io_error("list", dir, e))?;
    let mut loaded = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| io_error("list", dir, e))?
    {
        let path = entry.path();
        let is_record = path.extension().is_some_and(|ext| ext == "json")
            && path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.starts_with(prefix));
        if !is_record {
            continue;
        }

        match read_json(&path).await {
            Ok(record) => loaded.push(record),
            Err(e) => warn!("⚠️ Error cargando {}: {}", path.display(), e),
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie::fixtures::movie;
    use pretty_assertions::assert_eq;

    async fn storage(dir: &tempfile::TempDir) -> JsonStorage {
        JsonStorage::new(dir.path().to_path_buf()).await.unwrap()
    }

    #[tokio::test]
    async fn favourites_are_a_set_and_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        store
            .upsert_movies(&[movie(1, "A"), movie(2, "B")])
            .await
            .unwrap();

        assert!(store.add_favourite(42, 1).await.unwrap());
        assert!(store.add_favourite(42, 2).await.unwrap());
        assert!(!store.add_favourite(42, 1).await.unwrap());
        assert!(store.remove_favourite(42, 2).await.unwrap());
        assert!(!store.remove_favourite(42, 2).await.unwrap());

        let reopened = storage(&dir).await;
        assert_eq!(reopened.favourites(42).await.unwrap(), vec![movie(1, "A")]);
    }

    #[tokio::test]
    async fn unknown_movies_cannot_become_favourites() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        assert!(matches!(
            store.add_favourite(42, 999).await,
            Err(StorageError::UnknownMovie(999))
        ));
    }

    #[tokio::test]
    async fn last_trending_is_replaced_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        store
            .upsert_movies(&[movie(1, "A"), movie(2, "B"), movie(3, "C")])
            .await
            .unwrap();

        store.replace_last_trending(7, &[1, 2]).await.unwrap();
        store.replace_last_trending(7, &[3, 1]).await.unwrap();

        let titles: Vec<String> = store
            .last_trending(7)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn unknown_user_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        assert!(store.favourites(1).await.unwrap().is_empty());
        assert!(store.last_trending(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_keeps_a_known_trailer() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        store.upsert_movies(&[movie(603, "The Matrix")]).await.unwrap();

        assert!(store.set_trailer(603, "https://www.youtube.com/watch?v=a").await.unwrap());
        assert!(!store.set_trailer(603, "https://www.youtube.com/watch?v=b").await.unwrap());

        let mut refreshed = movie(603, "The Matrix");
        refreshed.vote_count = 30_000;
        store.upsert_movies(&[refreshed]).await.unwrap();

        let stored = store.movie(603).await.unwrap().unwrap();
        assert_eq!(stored.vote_count, 30_000);
        assert_eq!(stored.trailer.as_deref(), Some("https://www.youtube.com/watch?v=a"));
    }

    #[tokio::test]
    async fn genres_upsert_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        store
            .upsert_genres(&[Genre { id: 28, name: "Action".to_string() }])
            .await
            .unwrap();
        store
            .upsert_genres(&[
                Genre { id: 28, name: "Бойовик".to_string() },
                Genre { id: 35, name: "Комедія".to_string() },
            ])
            .await
            .unwrap();

        let reopened = storage(&dir).await;
        assert_eq!(
            reopened.genres().await.unwrap(),
            vec![
                Genre { id: 28, name: "Бойовик".to_string() },
                Genre { id: 35, name: "Комедія".to_string() },
            ]
        );
        assert_eq!(reopened.stats().await.genres, 2);
    }
}
