use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{
    is_english,
    payload::{RawErrorBody, RawGenreList, RawMovie, RawPage, RawVideoList},
    MetadataSource, SourceError, FALLBACK_LANGUAGE,
};
use crate::{
    config::Config,
    movie::{Genre, Movie, MovieId, TimeWindow},
};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/original";

/// Connection settings for [`TmdbClient`].
#[derive(Debug, Clone)]
pub struct TmdbSettings {
    pub token: String,
    pub base_url: String,
    pub image_base_url: String,
    pub timeout: Duration,
}

impl From<&Config> for TmdbSettings {
    fn from(config: &Config) -> Self {
        Self {
            token: config.tmdb_token.clone(),
            base_url: config.tmdb_base_url.clone(),
            image_base_url: config.tmdb_image_base_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// TMDB v3 client authenticated with a bearer token.
pub struct TmdbClient {
    client: Client,
    token: String,
    base_url: String,
    image_base_url: String,
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url)
            .field("image_base_url", &self.image_base_url)
            .finish_non_exhaustive()
    }
}

impl TmdbClient {
    pub fn new(settings: TmdbSettings) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        info!(
            "🎬 Cliente TMDB listo en {} (timeout {:?})",
            settings.base_url, settings.timeout
        );

        Ok(Self {
            client,
            token: settings.token,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            image_base_url: settings.image_base_url,
        })
    }

    /// GETs `path` and decodes the body. A 404 is `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>, SourceError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| {
                error!("❌ [GET] {} {:?}: {}", path, params, e);
                SourceError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            debug!("🔍 [GET {}] {} {:?}", status.as_u16(), path, params);
            return Ok(None);
        }

        if !status.is_success() {
            error!("❌ [GET {}] {} {:?}: {}", status.as_u16(), path, params, body);
            let parsed: RawErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(SourceError::Provider {
                status: status.as_u16(),
                message: parsed.status_message.unwrap_or(body),
            });
        }

        debug!("✅ [GET {}] {} {:?}", status.as_u16(), path, params);
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| SourceError::MalformedData(format!("{}: {}", path, e)))
    }

    async fn page(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<Vec<RawMovie>>, SourceError> {
        Ok(self
            .get_json::<RawPage>(path, params)
            .await?
            .and_then(RawPage::into_results))
    }

    async fn trailer_in(&self, id: MovieId, language: &str) -> Result<Option<String>, SourceError> {
        Ok(self
            .get_json::<RawVideoList>(&format!("/movie/{}/videos", id), &[("language", language)])
            .await?
            .and_then(RawVideoList::best_trailer))
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    async fn search(&self, query: &str, language: &str) -> Result<Option<Movie>, SourceError> {
        let Some(results) = self
            .page("/search/movie", &[("query", query), ("language", language)])
            .await?
        else {
            return Ok(None);
        };

        match results.into_iter().next() {
            Some(first) => first.into_movie(&self.image_base_url).map(Some),
            None => Ok(None),
        }
    }

    async fn trending(
        &self,
        window: TimeWindow,
        language: &str,
    ) -> Result<Option<Vec<Movie>>, SourceError> {
        let path = format!("/trending/movie/{}", window.as_str());
        let Some(results) = self.page(&path, &[("language", language)]).await? else {
            return Ok(None);
        };

        results
            .into_iter()
            .map(|raw| raw.into_movie(&self.image_base_url))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    async fn movie_by_id(
        &self,
        id: MovieId,
        language: &str,
    ) -> Result<Option<Movie>, SourceError> {
        match self
            .get_json::<RawMovie>(&format!("/movie/{}", id), &[("language", language)])
            .await?
        {
            Some(raw) => raw.into_movie(&self.image_base_url).map(Some),
            None => Ok(None),
        }
    }

    async fn movie_trailer(
        &self,
        id: MovieId,
        language: &str,
    ) -> Result<Option<String>, SourceError> {
        if let Some(url) = self.trailer_in(id, language).await? {
            return Ok(Some(url));
        }
        if is_english(language) {
            return Ok(None);
        }

        debug!("🎞️ Sin tráiler en {} para {}, probando {}", language, id, FALLBACK_LANGUAGE);
        self.trailer_in(id, FALLBACK_LANGUAGE).await
    }

    async fn genres(&self, language: &str) -> Result<Vec<Genre>, SourceError> {
        Ok(self
            .get_json::<RawGenreList>("/genre/movie/list", &[("language", language)])
            .await?
            .map(RawGenreList::into_genres)
            .unwrap_or_default())
    }
}
