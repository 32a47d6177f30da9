use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};
use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::{
    catalog::{CatalogError, Page},
    genres::GenreTable,
    movie::Movie,
    pagination::ListKind,
    sources::SourceError,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const CINEMA_GOLD: Colour = Colour::from_rgb(212, 175, 55);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎬 CineScout";

/// Shown for a missing release date or genre.
pub const UNKNOWN: &str = "Unknown";

/// Tarjeta de película
pub fn movie_embed(movie: &Movie, genres: &GenreTable) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(format!("🎬 {}", movie.title))
        .description(&movie.overview)
        .color(colors::CINEMA_GOLD)
        .field("🎞️ Original title", &movie.original_title, true)
        .field("🏷️ Genres", genre_line(movie, genres), true)
        .field("📅 Release date", format_release_date(movie.release_date), true)
        .field("⭐ Rating", format_rating(movie.average_rating), true)
        .field("🗳️ Votes", format_votes(movie.vote_count), true)
        .image(&movie.poster_path);

    if let Some(trailer) = &movie.trailer {
        embed = embed.url(trailer);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Tarjeta de película dentro de una lista paginada
pub fn page_embed(page: &Page, genres: &GenreTable) -> CreateEmbed {
    let list = match page.list {
        ListKind::Trending => "📈 Trending",
        ListKind::Favourites => "⭐ Favourites",
    };
    movie_embed(&page.movie, genres).footer(CreateEmbedFooter::new(format!(
        "{} · {}/{} · {}",
        list,
        page.index + 1,
        page.len,
        STANDARD_FOOTER
    )))
}

/// Lines shown before the list is cut short.
const FAVOURITES_LIST_LIMIT: usize = 25;

/// Numbered overview of a user's favourites, each with its `/view` id.
pub fn favourites_list_embed(movies: &[Movie]) -> CreateEmbed {
    let mut lines: Vec<String> = movies
        .iter()
        .take(FAVOURITES_LIST_LIMIT)
        .enumerate()
        .map(|(i, movie)| {
            format!("`{}.` **{}** · `/view {}`", i + 1, listed_title(movie), movie.id)
        })
        .collect();
    if movies.len() > FAVOURITES_LIST_LIMIT {
        lines.push(format!("… and {} more", movies.len() - FAVOURITES_LIST_LIMIT));
    }

    CreateEmbed::default()
        .title(format!("⭐ Your favourites ({})", movies.len()))
        .description(lines.join("\n"))
        .color(colors::CINEMA_GOLD)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("🎬 CineScout - Commands")
        .color(colors::INFO_BLUE)
        .description("Find movies, browse what's trending and keep a list of favourites.")
        .field(
            "🔍 Discover",
            "• `/search <title>` - Find a movie by title\n\
            • `/view <id>` - Show a movie by its TMDB id\n\
            • `/trending [day|week]` - Browse trending movies",
            false,
        )
        .field(
            "⭐ Favourites",
            "• `/favourites` - Browse your favourites\n\
            • Press ⭐ on any card to add or remove it",
            false,
        )
        .field(
            "🧭 Browsing",
            "• `← Previous` / `Next →` move through a list and wrap around\n\
            • `▶ Trailer` opens the trailer when one is known",
            false,
        )
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

pub fn error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn warning_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("⚠️ {}", title))
        .description(description)
        .color(colors::WARNING_ORANGE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("✅ {}", title))
        .description(description)
        .color(colors::SUCCESS_GREEN)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn info_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("ℹ️ {}", title))
        .description(description)
        .color(colors::INFO_BLUE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Error embed for a failed chat operation.
pub fn failure_embed(error: &CatalogError) -> CreateEmbed {
    let (title, description) = describe_failure(error);
    error_embed(title, &description)
}

/// User-facing title and text for `error`. Only provider messages are shown
/// verbatim; storage and transport details stay in the logs.
pub fn describe_failure(error: &CatalogError) -> (&'static str, String) {
    match error {
        CatalogError::Source(SourceError::Provider { message, .. }) => (
            "Movie service error",
            format!("The movie service answered: {}", message),
        ),
        CatalogError::Source(SourceError::Transport(_)) => (
            "Connection problem",
            "The movie service could not be reached. Please try again later.".to_string(),
        ),
        CatalogError::Source(SourceError::MalformedData(_)) => (
            "Unexpected data",
            "The movie service sent data that could not be read.".to_string(),
        ),
        CatalogError::Storage(_) => (
            "Something went wrong",
            "Your request could not be completed. Please try again later.".to_string(),
        ),
        CatalogError::UnknownMovie(id) => (
            "Movie not found",
            format!("There is no movie with id {}.", id),
        ),
    }
}

/// `title (original title)` when the two differ.
fn listed_title(movie: &Movie) -> String {
    if movie.title == movie.original_title {
        movie.title.clone()
    } else {
        format!("{} ({})", movie.title, movie.original_title)
    }
}

fn genre_line(movie: &Movie, genres: &GenreTable) -> String {
    if movie.genre_ids.is_empty() {
        return UNKNOWN.to_string();
    }
    genres.names(&movie.genre_ids, UNKNOWN)
}

/// `YYYY/MM/DD`, or [`UNKNOWN`].
pub fn format_release_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| UNKNOWN.to_string(), |d| d.format("%Y/%m/%d").to_string())
}

pub fn format_rating(rating: f64) -> String {
    format!("{:.1}/10", rating)
}

pub fn format_votes(votes: u64) -> String {
    votes.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie::{fixtures::movie, Genre};
    use pretty_assertions::assert_eq;

    fn genres() -> GenreTable {
        GenreTable::from_genres(vec![Genre {
            id: 28,
            name: "Action".to_string(),
        }])
        .unwrap()
    }

    #[test]
    fn card_fields_are_formatted() {
        assert_eq!(format_release_date(NaiveDate::from_ymd_opt(1999, 3, 31)), "1999/03/31");
        assert_eq!(format_release_date(None), "Unknown");
        assert_eq!(format_rating(8.214), "8.2/10");
        assert_eq!(format_votes(25_000), "25,000");
    }

    #[test]
    fn unknown_genres_use_fallback_name() {
        let matrix = movie(603, "The Matrix");
        assert_eq!(genre_line(&matrix, &genres()), "Action, Unknown");

        let mut bare = movie(1, "Bare");
        bare.genre_ids.clear();
        assert_eq!(genre_line(&bare, &genres()), "Unknown");
    }

    #[test]
    fn card_links_trailer_and_shows_poster() {
        let mut matrix = movie(603, "The Matrix");
        matrix.set_trailer("https://www.youtube.com/watch?v=vKQi3bBA1y8");

        let embed = serde_json::to_value(movie_embed(&matrix, &genres())).unwrap();

        assert_eq!(embed["title"], "🎬 The Matrix");
        assert_eq!(embed["url"], "https://www.youtube.com/watch?v=vKQi3bBA1y8");
        assert_eq!(embed["image"]["url"], matrix.poster_path.as_str());
    }

    #[test]
    fn page_footer_shows_position() {
        let page = Page {
            list: ListKind::Trending,
            movie: movie(2, "B"),
            index: 1,
            len: 3,
            is_favourite: false,
        };
        let embed = serde_json::to_value(page_embed(&page, &genres())).unwrap();
        assert_eq!(embed["footer"]["text"], "📈 Trending · 2/3 · 🎬 CineScout");
    }

    #[test]
    fn favourites_list_numbers_titles_with_view_ids() {
        let mut localized = movie(603, "Матриця");
        localized.original_title = "The Matrix".to_string();
        let movies = vec![localized, movie(680, "Pulp Fiction")];

        let embed = serde_json::to_value(favourites_list_embed(&movies)).unwrap();

        assert_eq!(embed["title"], "⭐ Your favourites (2)");
        assert_eq!(
            embed["description"],
            "`1.` **Матриця (The Matrix)** · `/view 603`\n`2.` **Pulp Fiction** · `/view 680`"
        );
    }

    #[test]
    fn long_favourites_list_is_cut_short() {
        let movies: Vec<Movie> = (1..=30).map(|id| movie(id, "Film")).collect();

        let embed = serde_json::to_value(favourites_list_embed(&movies)).unwrap();
        let description = embed["description"].as_str().unwrap();

        assert_eq!(description.lines().count(), 26);
        assert!(description.contains("`25.` **Film** · `/view 25`"));
        assert!(description.ends_with("… and 5 more"));
    }

    #[test]
    fn provider_message_reaches_the_user() {
        let error = CatalogError::Source(SourceError::Provider {
            status: 401,
            message: "Invalid API key: You must be granted a valid key.".to_string(),
        });
        let (title, description) = describe_failure(&error);
        assert_eq!(title, "Movie service error");
        assert!(description.ends_with("Invalid API key: You must be granted a valid key."));

        let (title, _) = describe_failure(&CatalogError::Source(SourceError::MalformedData(
            "movie 3 has neither title nor original title".to_string(),
        )));
        assert_eq!(title, "Unexpected data");

        let (_, description) = describe_failure(&CatalogError::UnknownMovie(999));
        assert_eq!(description, "There is no movie with id 999.");
    }
}
