use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

fn all_commands() -> Vec<CreateCommand> {
    vec![
        search_command(),
        trending_command(),
        favourites_command(),
        view_command(),
        help_command(),
    ]
}

fn search_command() -> CreateCommand {
    CreateCommand::new("search")
        .description("Find a movie by title")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "query", "Movie title")
                .required(true)
                .max_length(200),
        )
}

fn trending_command() -> CreateCommand {
    CreateCommand::new("trending")
        .description("Browse trending movies")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "window", "Trending window")
                .add_string_choice("Today", "day")
                .add_string_choice("This week", "week"),
        )
}

fn favourites_command() -> CreateCommand {
    CreateCommand::new("favourites").description("Browse your favourite movies")
}

fn view_command() -> CreateCommand {
    CreateCommand::new("view")
        .description("Show a movie by its TMDB id")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "id", "TMDB movie id")
                .required(true)
                .min_int_value(1),
        )
}

fn help_command() -> CreateCommand {
    CreateCommand::new("help").description("List the available commands")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_chat_command_is_registered() {
        let names: Vec<String> = all_commands()
            .iter()
            .map(|command| {
                serde_json::to_value(command).unwrap()["name"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(names, vec!["search", "trending", "favourites", "view", "help"]);
    }
}
