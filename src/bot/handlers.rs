use anyhow::Result;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse},
    model::application::{CommandInteraction, ComponentInteraction},
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    bot::CineScoutBot,
    catalog::{CatalogError, FavouriteToggle, Page},
    movie::{Movie, MovieId, TimeWindow, UserId},
    pagination::{ButtonToken, FavouriteToken, ListKind, PaginationToken},
    ui::{buttons, embeds},
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &CineScoutBot,
) -> Result<()> {
    let user = command.user.id.get();
    info!("📝 Comando /{} usado por {} ({})", command.data.name, command.user.name, user);

    match command.data.name.as_str() {
        "help" => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .embed(embeds::help_embed())
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
        "search" => {
            let Some(query) = string_option(&command, "query").filter(|q| !q.trim().is_empty())
            else {
                return reply_invalid(ctx, &command, "Please give a movie title to search for.")
                    .await;
            };
            defer(ctx, &command, false).await?;
            let reply = search_reply(bot, user, query).await;
            finish(ctx, &command, reply).await?;
        }
        "view" => {
            let Some(id) = integer_option(&command, "id")
                .and_then(|id| MovieId::try_from(id).ok())
                .filter(|id| *id > 0)
            else {
                return reply_invalid(ctx, &command, "Movie ids are positive numbers.").await;
            };
            defer(ctx, &command, false).await?;
            let reply = view_reply(bot, user, id).await;
            finish(ctx, &command, reply).await?;
        }
        "trending" => {
            let window = match string_option(&command, "window") {
                Some(value) => match TimeWindow::parse(value) {
                    Some(window) => window,
                    None => {
                        return reply_invalid(ctx, &command, "The window must be `day` or `week`.")
                            .await
                    }
                },
                None => bot.config().default_trending_window,
            };
            // Listas paginadas: solo quien las pide puede navegarlas
            defer(ctx, &command, true).await?;
            let reply = match bot.catalog().trending(user, window).await {
                Ok(page) => list_reply(bot, user, page, "Nothing is trending right now.").await,
                Err(e) => Err(e),
            };
            finish(ctx, &command, reply).await?;
        }
        "favourites" => {
            defer(ctx, &command, true).await?;
            let reply = match bot.catalog().favourites_page(user).await {
                Ok(page) => {
                    list_reply(
                        bot,
                        user,
                        page,
                        "You have no favourites yet. Press ⭐ on any movie card to add one.",
                    )
                    .await
                }
                Err(e) => Err(e),
            };
            finish(ctx, &command, reply).await?;
        }
        _ => {
            command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("❌ Unknown command")
                            .ephemeral(true),
                    ),
                )
                .await?;
        }
    }

    Ok(())
}

/// Maneja interacciones con componentes (botones)
pub async fn handle_component(
    ctx: &Context,
    component: ComponentInteraction,
    bot: &CineScoutBot,
) -> Result<()> {
    let user = component.user.id.get();
    info!("🔘 Botón {} presionado por {} ({})", component.data.custom_id, component.user.name, user);

    let token = match component.data.custom_id.parse::<ButtonToken>() {
        Ok(token) => token,
        Err(e) => {
            warn!("⚠️ Botón inválido de {}: {}", user, e);
            component
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .embed(embeds::warning_embed(
                                "Invalid request",
                                "This button is not recognised. Run the command again.",
                            ))
                            .ephemeral(true),
                    ),
                )
                .await?;
            return Ok(());
        }
    };

    match token {
        ButtonToken::Page(token) => handle_page(ctx, &component, bot, user, token).await,
        ButtonToken::Favourite(token) => handle_favourite(ctx, &component, bot, user, token).await,
    }
}

async fn handle_page(
    ctx: &Context,
    component: &ComponentInteraction,
    bot: &CineScoutBot,
    user: UserId,
    token: PaginationToken,
) -> Result<()> {
    component
        .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
        .await?;

    let edit = match bot.catalog().step(user, token).await {
        Ok(Some(page)) => page_reply(bot, user, page).await,
        Ok(None) => Ok(EditInteractionResponse::new()
            .embed(embeds::warning_embed(
                "List not found",
                "This list is no longer available. Run the command again.",
            ))
            .components(Vec::new())),
        Err(e) => Err(e),
    };
    // El mensaje conserva sus botones para reintentar
    let edit = edit.unwrap_or_else(|e| {
        warn!("❌ Error paginando para {}: {}", user, e);
        EditInteractionResponse::new().embed(embeds::failure_embed(&e))
    });

    component.edit_response(&ctx.http, edit).await?;
    Ok(())
}

async fn handle_favourite(
    ctx: &Context,
    component: &ComponentInteraction,
    bot: &CineScoutBot,
    user: UserId,
    token: FavouriteToken,
) -> Result<()> {
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(true),
            ),
        )
        .await?;

    let embed = match bot.catalog().toggle_favourite(user, token.movie_id).await {
        Ok(FavouriteToggle::Added) => embeds::success_embed(
            "Added to favourites",
            "Use `/favourites` to browse your list.",
        ),
        Ok(FavouriteToggle::Removed) => embeds::info_embed(
            "Removed from favourites",
            "Use `/favourites` to browse your list.",
        ),
        Err(e) => {
            warn!("❌ Error cambiando favorito {} para {}: {}", token.movie_id, user, e);
            embeds::failure_embed(&e)
        }
    };

    component
        .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
        .await?;
    Ok(())
}

async fn search_reply(
    bot: &CineScoutBot,
    user: UserId,
    query: &str,
) -> Result<EditInteractionResponse, CatalogError> {
    match bot.catalog().search(user, query).await? {
        Some(movie) => movie_reply(bot, user, movie).await,
        None => Ok(EditInteractionResponse::new().embed(embeds::info_embed(
            "No results",
            &format!("Nothing found for \"{}\".", query.trim()),
        ))),
    }
}

async fn view_reply(
    bot: &CineScoutBot,
    user: UserId,
    id: MovieId,
) -> Result<EditInteractionResponse, CatalogError> {
    match bot.catalog().movie(user, id).await? {
        Some(movie) => movie_reply(bot, user, movie).await,
        None => Ok(EditInteractionResponse::new().embed(embeds::info_embed(
            "Movie not found",
            &format!("There is no movie with id {}.", id),
        ))),
    }
}

async fn movie_reply(
    bot: &CineScoutBot,
    user: UserId,
    movie: Movie,
) -> Result<EditInteractionResponse, CatalogError> {
    let is_favourite = bot.catalog().is_favourite(user, movie.id).await?;
    Ok(EditInteractionResponse::new()
        .embed(embeds::movie_embed(&movie, bot.catalog().genres()))
        .components(buttons::movie_components(&movie, is_favourite)))
}

async fn list_reply(
    bot: &CineScoutBot,
    user: UserId,
    page: Option<Page>,
    empty: &str,
) -> Result<EditInteractionResponse, CatalogError> {
    match page {
        Some(page) => page_reply(bot, user, page).await,
        None => {
            Ok(EditInteractionResponse::new().embed(embeds::info_embed("Nothing to show", empty)))
        }
    }
}

/// A list card with its paginator; favourites cards sit below the whole list.
async fn page_reply(
    bot: &CineScoutBot,
    user: UserId,
    page: Page,
) -> Result<EditInteractionResponse, CatalogError> {
    let card = embeds::page_embed(&page, bot.catalog().genres());
    let reply = EditInteractionResponse::new().components(buttons::page_components(&page));

    Ok(match page.list {
        ListKind::Favourites => {
            let favourites = bot.catalog().favourites(user).await?;
            reply.embeds(vec![embeds::favourites_list_embed(&favourites), card])
        }
        ListKind::Trending => reply.embed(card),
    })
}

async fn defer(ctx: &Context, command: &CommandInteraction, ephemeral: bool) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(ephemeral),
            ),
        )
        .await?;
    Ok(())
}

/// Sends the deferred reply, or the failure embed when the operation failed.
async fn finish(
    ctx: &Context,
    command: &CommandInteraction,
    reply: Result<EditInteractionResponse, CatalogError>,
) -> Result<()> {
    let response = reply.unwrap_or_else(|e| {
        warn!("❌ /{} falló para {}: {}", command.data.name, command.user.id, e);
        EditInteractionResponse::new().embed(embeds::failure_embed(&e))
    });
    command.edit_response(&ctx.http, response).await?;
    Ok(())
}

async fn reply_invalid(ctx: &Context, command: &CommandInteraction, message: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::warning_embed("Invalid request", message))
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
}

fn integer_option(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_i64())
}
