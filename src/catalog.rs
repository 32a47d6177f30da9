//! Chat-facing movie operations.
//!
//! [`Catalog`] owns every cache tier, the genre table and handles to the
//! metadata source and the durable store. Lookups read through the lookup
//! tier; list views and pagination go through the session tier and fall back
//! to storage.
//!
//! Every operation runs its fallible steps (provider, storage) before it
//! touches a cache, so a failure never leaves a half-written session.

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    cache::{
        get_or_try_compute, log_cache_stats, BoundedCache, CacheSettings, Clock, LookupCaches,
        RecencyCache, SessionCaches,
    },
    genres::GenreTable,
    movie::{Movie, MovieId, TimeWindow, UserId},
    pagination::{ListKind, PaginationToken},
    sources::{MetadataSource, SourceError},
    storage::{MovieStore, StorageError},
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("movie {0} not found")]
    UnknownMovie(MovieId),
}

/// One card of a browsable list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub list: ListKind,
    pub movie: Movie,
    pub index: usize,
    pub len: usize,
    pub is_favourite: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavouriteToggle {
    Added,
    Removed,
}

pub struct Catalog {
    source: Arc<dyn MetadataSource>,
    store: Arc<dyn MovieStore>,
    genres: GenreTable,
    lookup: LookupCaches,
    sessions: SessionCaches,
    language: String,
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("language", &self.language)
            .field("genres", &self.genres.len())
            .finish_non_exhaustive()
    }
}

impl Catalog {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        store: Arc<dyn MovieStore>,
        genres: GenreTable,
        settings: &CacheSettings,
        clock: Arc<dyn Clock>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            genres,
            lookup: LookupCaches::new(settings, clock),
            sessions: SessionCaches::new(settings),
            language: language.into(),
            user_locks: DashMap::new(),
        }
    }

    pub fn genres(&self) -> &GenreTable {
        &self.genres
    }

    /// First search hit for `query`, served from the search cache when fresh.
    pub async fn search(&self, user: UserId, query: &str) -> Result<Option<Movie>, CatalogError> {
        let key = LookupCaches::search_key(query);
        if key.is_empty() {
            return Ok(None);
        }

        let found = get_or_try_compute(&self.lookup.search, key, || async {
            let found = self.source.search(query, &self.language).await?;
            if let Some(movie) = &found {
                self.store.upsert_movies(std::slice::from_ref(movie)).await?;
            }
            Ok::<_, CatalogError>(found)
        })
        .await?;

        let Some(mut movie) = found else {
            debug!("🔍 Sin resultados para '{}'", query);
            return Ok(None);
        };
        self.ensure_trailer(Some(user), &mut movie).await?;
        Ok(Some(movie))
    }

    /// Movie details by id, served from the by-id cache when fresh.
    pub async fn movie(&self, user: UserId, id: MovieId) -> Result<Option<Movie>, CatalogError> {
        let Some(mut movie) = self.fetch_movie(id).await? else {
            return Ok(None);
        };
        self.ensure_trailer(Some(user), &mut movie).await?;
        Ok(Some(movie))
    }

    /// Fetches the trending list, makes it `user`'s active trending list and
    /// returns its first card.
    pub async fn trending(
        &self,
        user: UserId,
        window: TimeWindow,
    ) -> Result<Option<Page>, CatalogError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let fetched = get_or_try_compute(&self.lookup.trending, window, || async {
            let movies = self.source.trending(window, &self.language).await?;
            if let Some(movies) = &movies {
                self.store.upsert_movies(movies).await?;
            }
            Ok::<_, CatalogError>(movies)
        })
        .await?;

        let Some(movies) = fetched.filter(|movies| !movies.is_empty()) else {
            return Ok(None);
        };

        let ids: Vec<MovieId> = movies.iter().map(|m| m.id).collect();
        self.store.replace_last_trending(user, &ids).await?;
        self.sessions.trending.insert(user, movies.clone());
        info!("📈 {} películas en tendencia ({}) para {}", movies.len(), window, user);

        self.page_at(user, ListKind::Trending, movies, 0).await
    }

    /// `user`'s favourites, session cache first.
    pub async fn favourites(&self, user: UserId) -> Result<Vec<Movie>, CatalogError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;
        self.load_favourites(user).await
    }

    pub async fn is_favourite(
        &self,
        user: UserId,
        movie_id: MovieId,
    ) -> Result<bool, CatalogError> {
        Ok(self.favourites(user).await?.iter().any(|m| m.id == movie_id))
    }

    /// First card of `user`'s favourites, or `None` if there are none.
    pub async fn favourites_page(&self, user: UserId) -> Result<Option<Page>, CatalogError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let movies = self.load_favourites(user).await?;
        if movies.is_empty() {
            return Ok(None);
        }
        self.page_at(user, ListKind::Favourites, movies, 0).await
    }

    /// Adds `movie_id` to `user`'s favourites, or removes it if present.
    /// Storage and the session cache change together.
    pub async fn toggle_favourite(
        &self,
        user: UserId,
        movie_id: MovieId,
    ) -> Result<FavouriteToggle, CatalogError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let mut favourites = self.load_favourites(user).await?;

        if favourites.iter().any(|m| m.id == movie_id) {
            self.store.remove_favourite(user, movie_id).await?;
            favourites.retain(|m| m.id != movie_id);
            self.sessions.favourites.insert(user, favourites);
            info!("🗑️ Película {} eliminada de favoritos de {}", movie_id, user);
            return Ok(FavouriteToggle::Removed);
        }

        let movie = match self.store.movie(movie_id).await? {
            Some(movie) => movie,
            None => self
                .fetch_movie(movie_id)
                .await?
                .ok_or(CatalogError::UnknownMovie(movie_id))?,
        };

        self.store.add_favourite(user, movie_id).await?;
        favourites.push(movie);
        self.sessions.favourites.insert(user, favourites);
        info!("⭐ Película {} añadida a favoritos de {}", movie_id, user);
        Ok(FavouriteToggle::Added)
    }

    /// Handles a PREV/NEXT press. `None` means the list is gone from both the
    /// session cache and storage; nothing changes in that case.
    pub async fn step(
        &self,
        user: UserId,
        token: PaginationToken,
    ) -> Result<Option<Page>, CatalogError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let Some(movies) = self.resolve_active_list(user, token.list).await? else {
            debug!("📭 Lista {:?} no encontrada para {}", token.list, user);
            return Ok(None);
        };
        let Some(index) = token.target_index(movies.len()) else {
            return Ok(None);
        };

        self.page_at(user, token.list, movies, index).await
    }

    /// The list a paginator for `list` currently browses: session cache
    /// first, then storage (which repopulates the session cache).
    pub async fn resolve_active_list(
        &self,
        user: UserId,
        list: ListKind,
    ) -> Result<Option<Vec<Movie>>, CatalogError> {
        let session = self.session(list);
        if let Some(movies) = session.get(&user).filter(|movies| !movies.is_empty()) {
            return Ok(Some(movies));
        }

        let stored = match list {
            ListKind::Trending => self.store.last_trending(user).await?,
            ListKind::Favourites => self.store.favourites(user).await?,
        };
        if stored.is_empty() {
            return Ok(None);
        }

        debug!("📂 Lista {:?} de {} recuperada del almacenamiento", list, user);
        session.insert(user, stored.clone());
        Ok(Some(stored))
    }

    /// Periodic housekeeping: expired lookups, idle user locks, stats.
    pub fn run_maintenance(&self) {
        let purged = self.lookup.purge_expired();
        if purged > 0 {
            info!("🧹 Limpieza de cache: {} entradas expiradas eliminadas", purged);
        }
        self.user_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        log_cache_stats(&self.lookup, &self.sessions);
    }

    fn session(&self, list: ListKind) -> &RecencyCache<UserId, Vec<Movie>> {
        match list {
            ListKind::Trending => &self.sessions.trending,
            ListKind::Favourites => &self.sessions.favourites,
        }
    }

    fn user_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        self.user_locks.entry(user).or_default().clone()
    }

    async fn load_favourites(&self, user: UserId) -> Result<Vec<Movie>, CatalogError> {
        if let Some(movies) = self.sessions.favourites.get(&user) {
            return Ok(movies);
        }
        let movies = self.store.favourites(user).await?;
        self.sessions.favourites.insert(user, movies.clone());
        Ok(movies)
    }

    async fn fetch_movie(&self, id: MovieId) -> Result<Option<Movie>, CatalogError> {
        get_or_try_compute(&self.lookup.by_id, id, || async {
            let movie = self.source.movie_by_id(id, &self.language).await?;
            if let Some(movie) = &movie {
                self.store.upsert_movies(std::slice::from_ref(movie)).await?;
            }
            Ok::<_, CatalogError>(movie)
        })
        .await
    }

    async fn page_at(
        &self,
        user: UserId,
        list: ListKind,
        movies: Vec<Movie>,
        index: usize,
    ) -> Result<Option<Page>, CatalogError> {
        let len = movies.len();
        let Some(mut movie) = movies.into_iter().nth(index) else {
            return Ok(None);
        };

        self.ensure_trailer(Some(user), &mut movie).await?;

        let is_favourite = match list {
            ListKind::Favourites => true,
            ListKind::Trending => self
                .load_favourites(user)
                .await?
                .iter()
                .any(|m| m.id == movie.id),
        };

        Ok(Some(Page {
            list,
            movie,
            index,
            len,
            is_favourite,
        }))
    }

    /// Resolves `movie`'s trailer if it has none yet, then writes it to
    /// storage and every cache tier holding a copy. A known trailer is never
    /// replaced.
    async fn ensure_trailer(
        &self,
        user: Option<UserId>,
        movie: &mut Movie,
    ) -> Result<(), CatalogError> {
        if movie.trailer.is_some() || self.lookup.trailer_misses.get(&movie.id).is_some() {
            return Ok(());
        }

        let stored = self.store.movie(movie.id).await?.and_then(|m| m.trailer);
        let url = match stored {
            Some(url) => url,
            None => match self.source.movie_trailer(movie.id, &self.language).await? {
                Some(url) => self.persist_trailer(movie, &url).await?,
                None => {
                    debug!("🎞️ Película {} sin tráiler", movie.id);
                    self.lookup.trailer_misses.insert(movie.id, ());
                    return Ok(());
                }
            },
        };

        movie.set_trailer(url.as_str());
        self.lookup.record_trailer(movie.id, &url);
        if let Some(user) = user {
            self.sessions.record_trailer(user, movie.id, &url);
        }
        Ok(())
    }

    /// Stores `url` for `movie` and returns the trailer the store ends up
    /// holding, which is the earlier one if another task stored it first.
    async fn persist_trailer(&self, movie: &Movie, url: &str) -> Result<String, CatalogError> {
        match self.store.set_trailer(movie.id, url).await {
            Ok(true) => Ok(url.to_string()),
            Ok(false) => {
                let stored = self.store.movie(movie.id).await?.and_then(|m| m.trailer);
                debug!("🎞️ Tráiler de {} ya estaba guardado", movie.id);
                Ok(stored.unwrap_or_else(|| url.to_string()))
            }
            Err(StorageError::UnknownMovie(_)) => {
                warn!("⚠️ Película {} no estaba almacenada, guardándola con tráiler", movie.id);
                let mut record = movie.clone();
                record.set_trailer(url);
                self.store.upsert_movies(&[record]).await?;
                Ok(url.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }
}
