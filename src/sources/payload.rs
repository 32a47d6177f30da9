//! Raw provider payloads and their normalization into domain values.

use chrono::NaiveDate;
use serde::Deserialize;

use super::SourceError;
use crate::movie::{Genre, Movie, MISSING_OVERVIEW, POSTER_PLACEHOLDER_URL};

const TRAILER_SITE: &str = "YouTube";
const TRAILER_KIND: &str = "Trailer";
const TRAILER_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Paged list envelope (search, trending).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPage {
    pub results: Option<Vec<RawMovie>>,
    pub total_results: Option<u64>,
}

impl RawPage {
    /// Records of a usable page, or `None` for an empty or incomplete one.
    pub fn into_results(self) -> Option<Vec<RawMovie>> {
        match (self.results, self.total_results) {
            (Some(results), Some(total)) if !results.is_empty() && total > 0 => Some(results),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawMovie {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    /// Present on list endpoints.
    pub genre_ids: Option<Vec<u64>>,
    /// Present on the details endpoint instead of `genre_ids`.
    pub genres: Option<Vec<RawGenre>>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
}

impl RawMovie {
    pub fn into_movie(self, image_base_url: &str) -> Result<Movie, SourceError> {
        let id = self
            .id
            .ok_or_else(|| SourceError::MalformedData("movie record without id".to_string()))?;

        let title = non_empty(self.title);
        let original_title = non_empty(self.original_title);
        let (title, original_title) = match (title, original_title) {
            (Some(title), Some(original)) => (title, original),
            (Some(title), None) => (title.clone(), title),
            (None, Some(original)) => (original.clone(), original),
            (None, None) => {
                return Err(SourceError::MalformedData(format!(
                    "movie {} has neither title nor original title",
                    id
                )))
            }
        };

        let genre_ids = match (self.genre_ids, self.genres) {
            (Some(ids), _) => ids,
            (None, Some(genres)) => genres.into_iter().filter_map(|g| g.id).collect(),
            (None, None) => Vec::new(),
        };

        Ok(Movie {
            id,
            title,
            original_title,
            overview: non_empty(self.overview).unwrap_or_else(|| MISSING_OVERVIEW.to_string()),
            poster_path: poster_url(self.poster_path.as_deref(), image_base_url),
            genre_ids,
            release_date: self
                .release_date
                .as_deref()
                .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()),
            average_rating: self.vote_average.unwrap_or(0.0),
            vote_count: self.vote_count.unwrap_or(0),
            trailer: None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawGenre {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawGenreList {
    pub genres: Option<Vec<RawGenre>>,
}

impl RawGenreList {
    pub fn into_genres(self) -> Vec<Genre> {
        self.genres
            .unwrap_or_default()
            .into_iter()
            .filter_map(|genre| match (genre.id, non_empty(genre.name)) {
                (Some(id), Some(name)) if id != 0 => Some(Genre { id, name }),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawVideoList {
    pub results: Option<Vec<RawVideo>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawVideo {
    pub key: Option<String>,
    pub site: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub official: Option<bool>,
    pub size: Option<u32>,
}

impl RawVideoList {
    /// Highest-resolution official YouTube trailer.
    pub fn best_trailer(self) -> Option<String> {
        self.results
            .unwrap_or_default()
            .into_iter()
            .filter(|video| {
                video.official == Some(true)
                    && video.kind.as_deref() == Some(TRAILER_KIND)
                    && video.site.as_deref() == Some(TRAILER_SITE)
                    && video.key.as_deref().is_some_and(|key| !key.is_empty())
            })
            .max_by_key(|video| video.size.unwrap_or(0))
            .and_then(|video| video.key)
            .map(|key| format!("{}{}", TRAILER_URL_PREFIX, key))
    }
}

/// Error body the provider sends with non-success statuses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawErrorBody {
    pub status_message: Option<String>,
}

/// Absolute poster URL for a provider-relative path, or the placeholder.
pub fn poster_url(path: Option<&str>, image_base_url: &str) -> String {
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) if path.starts_with("http://") || path.starts_with("https://") => {
            path.to_string()
        }
        Some(path) => format!(
            "{}/{}",
            image_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        None => POSTER_PLACEHOLDER_URL.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
