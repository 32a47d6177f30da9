use anyhow::{Context, Result};
use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::{
    movie::TimeWindow,
    sources::tmdb::{DEFAULT_BASE_URL, DEFAULT_IMAGE_BASE_URL},
};

/// Optional file layer, looked up in the working directory.
const CONFIG_FILE: &str = "cinescout";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Registro de comandos en desarrollo

    // TMDB
    pub tmdb_token: String,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub tmdb_language: String,
    pub request_timeout_secs: u64,

    // Cache
    pub lookup_cache_size: usize,
    pub lookup_cache_ttl_secs: u64,
    pub trending_cache_ttl_secs: u64,
    pub session_cache_size: usize,

    pub default_trending_window: TimeWindow,
    pub data_dir: PathBuf,
    pub maintenance_interval_secs: u64,
}

impl Config {
    /// Loads `.env`, then layers defaults, `cinescout.toml` (optional) and the
    /// process environment, in increasing priority.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Self = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
            .context("configuración inválida")?;

        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("no se pudo crear {}", config.data_dir.display()))?;

        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(config::Config::builder()
            .set_default("tmdb_base_url", DEFAULT_BASE_URL)?
            .set_default("tmdb_image_base_url", DEFAULT_IMAGE_BASE_URL)?
            .set_default("tmdb_language", "uk-UA")?
            .set_default("request_timeout_secs", 10_i64)?
            .set_default("lookup_cache_size", 256_i64)?
            .set_default("lookup_cache_ttl_secs", 600_i64)?
            .set_default("trending_cache_ttl_secs", 600_i64)?
            .set_default("session_cache_size", 1024_i64)?
            .set_default("default_trending_window", "week")?
            .set_default("data_dir", "./data")?
            .set_default("maintenance_interval_secs", 600_i64)?)
    }

    /// Rejects values the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }
        if self.application_id == 0 {
            anyhow::bail!("APPLICATION_ID must be set");
        }
        if self.tmdb_token.trim().is_empty() {
            anyhow::bail!("TMDB_TOKEN must not be empty");
        }
        if self.tmdb_language.trim().is_empty() {
            anyhow::bail!("TMDB_LANGUAGE must not be empty");
        }

        for (name, value) in [
            ("TMDB_BASE_URL", &self.tmdb_base_url),
            ("TMDB_IMAGE_BASE_URL", &self.tmdb_image_base_url),
        ] {
            Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", name, value))?;
        }

        if self.lookup_cache_size == 0 || self.session_cache_size == 0 {
            anyhow::bail!("Cache sizes must be greater than 0");
        }
        if self.lookup_cache_ttl_secs == 0 || self.trending_cache_ttl_secs == 0 {
            anyhow::bail!("Cache TTLs must be greater than 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be greater than 0");
        }
        if self.maintenance_interval_secs == 0 {
            anyhow::bail!("Maintenance interval must be greater than 0");
        }

        Ok(())
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    /// Token-free overview for the startup log.
    pub fn summary(&self) -> String {
        let secs = |s: u64| humantime::format_duration(Duration::from_secs(s));
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            TMDB: {} ({}), timeout {}\n  \
            Lookup cache: {} entries, search/movie {}, trending {}\n  \
            Session cache: {} users, default window {}\n  \
            Data: {}, maintenance every {}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.tmdb_base_url,
            self.tmdb_language,
            secs(self.request_timeout_secs),
            self.lookup_cache_size,
            secs(self.lookup_cache_ttl_secs),
            secs(self.trending_cache_ttl_secs),
            self.session_cache_size,
            self.default_trending_window,
            self.data_dir.display(),
            secs(self.maintenance_interval_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use pretty_assertions::assert_eq;

    const REQUIRED: &str = r#"
        discord_token = "discord-secret"
        application_id = 1234
        tmdb_token = "tmdb-secret"
    "#;

    fn from_toml(toml: &str) -> Config {
        Config::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_fill_everything_but_credentials() {
        let config = from_toml(REQUIRED);

        assert_eq!(config.tmdb_language, "uk-UA");
        assert_eq!(config.tmdb_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.lookup_cache_size, 256);
        assert_eq!(config.lookup_cache_ttl_secs, 600);
        assert_eq!(config.default_trending_window, TimeWindow::Week);
        assert_eq!(config.guild_id, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = from_toml(&format!(
            "{}\ntmdb_language = \"en-US\"\ndefault_trending_window = \"day\"\nguild_id = 99",
            REQUIRED
        ));
        assert_eq!(config.tmdb_language, "en-US");
        assert_eq!(config.default_trending_window, TimeWindow::Day);
        assert_eq!(config.guild_id, Some(99));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut config = from_toml(REQUIRED);
        config.tmdb_token = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = from_toml(REQUIRED);
        config.tmdb_base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = from_toml(REQUIRED);
        config.lookup_cache_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn summary_hides_tokens() {
        let summary = from_toml(REQUIRED).summary();
        assert!(!summary.contains("secret"));
        assert!(summary.contains("10m"));
    }
}
