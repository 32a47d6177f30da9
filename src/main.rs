use anyhow::{Context as _, Result};
use serenity::{model::gateway::GatewayIntents, Client};
use std::sync::Arc;
use tracing::{error, info};

mod bot;
mod cache;
mod catalog;
mod config;
mod genres;
mod movie;
mod pagination;
mod sources;
mod storage;
mod ui;

use crate::bot::CineScoutBot;
use crate::cache::{CacheSettings, SystemClock};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::genres::GenreTable;
use crate::sources::{TmdbClient, TmdbSettings};
use crate::storage::JsonStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cinescout=debug".parse()?)
                .add_directive("serenity=info".parse()?),
        )
        .init();

    info!("🎬 Iniciando CineScout v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    // Inicializar almacenamiento JSON
    let storage = Arc::new(JsonStorage::new(config.data_dir.clone()).await?);
    info!("💾 {}", storage.stats().await);

    let tmdb = Arc::new(TmdbClient::new(TmdbSettings::from(&config))?);

    // Sin géneros no se pueden renderizar tarjetas: fallo fatal
    let genres = GenreTable::preload(tmdb.as_ref(), storage.as_ref(), &config.tmdb_language)
        .await
        .context("no se pudo cargar la lista de géneros")?;

    let catalog = Arc::new(Catalog::new(
        tmdb,
        storage,
        genres,
        &CacheSettings::from(&config),
        Arc::new(SystemClock),
        config.tmdb_language.clone(),
    ));

    // Solo interacciones: no se necesitan intents privilegiados
    let intents = GatewayIntents::GUILDS;

    let handler = CineScoutBot::new(config.clone(), catalog);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
