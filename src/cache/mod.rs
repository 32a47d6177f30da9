//! # Cache Module
//!
//! Bounded in-memory caches that sit between chat interactions and the
//! metadata provider.
//!
//! ## Tiers
//!
//! - **Lookup tier** ([`LookupCaches`]): provider results keyed by search
//!   query, by movie id, and a single "currently trending" slot. Entries
//!   expire after a fixed window regardless of access and the oldest inserted
//!   entry is evicted once a cache is full. Absent results are cached too, so
//!   a repeated miss does not hit the network again inside the window.
//! - **Session tier** ([`SessionCaches`]): per-user favourites and trending
//!   snapshots in access order, with no expiry. They spare a storage round
//!   trip on every pagination step and are updated in the same operation that
//!   writes storage.
//!
//! ## Configuration
//!
//! ```env
//! LOOKUP_CACHE_SIZE=256          # entries per lookup cache
//! LOOKUP_CACHE_TTL_SECS=600      # search / by-id window
//! TRENDING_CACHE_TTL_SECS=600    # trending slot window
//! SESSION_CACHE_SIZE=1024        # users per session cache
//! ```
//!
//! Cache contents are never persisted; a restart starts cold.

pub mod clock;
pub mod lru_cache;

pub use clock::{Clock, SystemClock};
pub use lru_cache::{get_or_try_compute, BoundedCache, ExpiringCache, RecencyCache};

use std::{sync::Arc, time::Duration};
use tracing::info;

use crate::{
    config::Config,
    movie::{Movie, MovieId, TimeWindow, UserId},
};

/// Sizes and windows for both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub lookup_capacity: usize,
    pub lookup_ttl: Duration,
    pub trending_ttl: Duration,
    pub session_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            lookup_capacity: 256,
            lookup_ttl: Duration::from_secs(600),
            trending_ttl: Duration::from_secs(600),
            session_capacity: 1024,
        }
    }
}

impl From<&Config> for CacheSettings {
    fn from(config: &Config) -> Self {
        Self {
            lookup_capacity: config.lookup_cache_size,
            lookup_ttl: Duration::from_secs(config.lookup_cache_ttl_secs),
            trending_ttl: Duration::from_secs(config.trending_cache_ttl_secs),
            session_capacity: config.session_cache_size,
        }
    }
}

/// Provider result caches.
#[derive(Debug)]
pub struct LookupCaches {
    /// Normalized query → first search hit (or `None`).
    pub search: ExpiringCache<String, Option<Movie>>,
    /// Movie id → details (or `None` when the provider has no such movie).
    pub by_id: ExpiringCache<MovieId, Option<Movie>>,
    /// Single slot holding the latest trending list.
    pub trending: ExpiringCache<TimeWindow, Option<Vec<Movie>>>,
    /// Movies whose trailer lookup came back empty.
    pub trailer_misses: ExpiringCache<MovieId, ()>,
}

impl LookupCaches {
    pub fn new(settings: &CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            search: ExpiringCache::new(
                "search",
                settings.lookup_capacity,
                settings.lookup_ttl,
                clock.clone(),
            ),
            by_id: ExpiringCache::new(
                "movie",
                settings.lookup_capacity,
                settings.lookup_ttl,
                clock.clone(),
            ),
            trending: ExpiringCache::new("trending", 1, settings.trending_ttl, clock.clone()),
            trailer_misses: ExpiringCache::new(
                "trailer-miss",
                settings.lookup_capacity,
                settings.lookup_ttl,
                clock,
            ),
        }
    }

    /// Normalized search key: trimmed, case-folded, inner whitespace collapsed.
    pub fn search_key(query: &str) -> String {
        query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Writes a resolved trailer into every cached copy of `movie_id`.
    pub fn record_trailer(&self, movie_id: MovieId, url: &str) {
        let apply = |movie: &mut Movie| {
            if movie.id == movie_id {
                movie.set_trailer(url);
            }
        };

        self.by_id.update(&movie_id, |cached| {
            if let Some(movie) = cached {
                apply(movie);
            }
        });
        self.search.update_all(|cached| {
            if let Some(movie) = cached {
                apply(movie);
            }
        });
        self.trending.update_all(|cached| {
            if let Some(list) = cached {
                list.iter_mut().for_each(apply);
            }
        });
    }

    /// Drops expired entries from every lookup cache.
    pub fn purge_expired(&self) -> usize {
        self.search.purge_expired()
            + self.by_id.purge_expired()
            + self.trending.purge_expired()
            + self.trailer_misses.purge_expired()
    }
}

/// Per-user list caches used by pagination.
#[derive(Debug)]
pub struct SessionCaches {
    pub favourites: RecencyCache<UserId, Vec<Movie>>,
    pub trending: RecencyCache<UserId, Vec<Movie>>,
}

impl SessionCaches {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            favourites: RecencyCache::new("favourites", settings.session_capacity),
            trending: RecencyCache::new("session-trending", settings.session_capacity),
        }
    }

    /// Writes a resolved trailer into both of `user_id`'s lists.
    pub fn record_trailer(&self, user_id: UserId, movie_id: MovieId, url: &str) {
        let apply = |list: &mut Vec<Movie>| {
            for movie in list.iter_mut().filter(|m| m.id == movie_id) {
                movie.set_trailer(url);
            }
        };
        self.favourites.update(&user_id, apply);
        self.trending.update(&user_id, apply);
    }
}

/// Logs hit/miss counters for every cache.
pub fn log_cache_stats(lookup: &LookupCaches, session: &SessionCaches) {
    let report = [
        ("search", lookup.search.metrics(), lookup.search.len()),
        ("movie", lookup.by_id.metrics(), lookup.by_id.len()),
        ("trending", lookup.trending.metrics(), lookup.trending.len()),
        ("favourites", session.favourites.metrics(), session.favourites.len()),
        ("session-trending", session.trending.metrics(), session.trending.len()),
    ];

    for (name, metrics, len) in report {
        info!(
            "📊 Cache {}: {} entradas, {:.1}% aciertos ({} hits / {} misses), {} desalojadas, {} expiradas",
            name,
            len,
            metrics.hit_rate() * 100.0,
            metrics.hits,
            metrics.misses,
            metrics.evictions,
            metrics.expired_removals
        );
    }
}
