//! # Bot Module
//!
//! Discord front end for CineScout.
//!
//! [`CineScoutBot`] implements Serenity's [`EventHandler`]: it registers the
//! slash commands on `ready`, starts the cache maintenance task and routes
//! every interaction to [`handlers`]. All movie logic lives in [`Catalog`];
//! this layer only parses input and renders embeds and buttons.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready},
    async_trait,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{catalog::Catalog, config::Config};

pub struct CineScoutBot {
    config: Arc<Config>,
    catalog: Arc<Catalog>,
    /// `ready` fires again after a reconnect; maintenance must start once.
    maintenance_started: AtomicBool,
}

impl CineScoutBot {
    pub fn new(config: Config, catalog: Arc<Catalog>) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            maintenance_started: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers slash commands, per guild when `guild_id` is configured
    /// (near-instant propagation) and globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                let guild_id = GuildId::from(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos globales: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                    })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for CineScoutBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        if !self.maintenance_started.swap(true, Ordering::SeqCst) {
            let catalog = self.catalog.clone();
            let every = self.config.maintenance_interval();
            tokio::spawn(async move {
                maintenance_tasks(catalog, every).await;
            });
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }
}

/// Purges expired lookup entries and logs cache statistics every `every`.
async fn maintenance_tasks(catalog: Arc<Catalog>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // El primer tick es inmediato
    interval.tick().await;

    loop {
        interval.tick().await;
        catalog.run_maintenance();
        info!("🧹 Tareas de mantenimiento completadas");
    }
}
