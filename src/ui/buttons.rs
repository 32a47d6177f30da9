use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

use crate::{
    catalog::Page,
    movie::Movie,
    pagination::{FavouriteToken, ListKind, PageAction, PaginationToken},
};

/// ← Previous / Next → for the card at `index`.
pub fn paginator_row(list: ListKind, index: usize) -> CreateActionRow {
    let prev_btn =
        CreateButton::new(PaginationToken::new(list, PageAction::Prev, index).to_string())
        .label("← Previous")
        .style(ButtonStyle::Primary);

    let next_btn =
        CreateButton::new(PaginationToken::new(list, PageAction::Next, index).to_string())
        .label("Next →")
        .style(ButtonStyle::Primary);

    CreateActionRow::Buttons(vec![prev_btn, next_btn])
}

/// ⭐ toggle plus a trailer link when one is known.
pub fn movie_row(movie: &Movie, is_favourite: bool) -> CreateActionRow {
    let (label, style) = if is_favourite {
        ("Remove from favourites", ButtonStyle::Success)
    } else {
        ("Add to favourites", ButtonStyle::Secondary)
    };
    let favourite_btn = CreateButton::new(FavouriteToken { movie_id: movie.id }.to_string())
        .emoji('⭐')
        .label(label)
        .style(style);

    let mut buttons = vec![favourite_btn];
    if let Some(trailer) = &movie.trailer {
        buttons.push(CreateButton::new_link(trailer).label("▶ Trailer"));
    }

    CreateActionRow::Buttons(buttons)
}

/// Components for a single movie card.
pub fn movie_components(movie: &Movie, is_favourite: bool) -> Vec<CreateActionRow> {
    vec![movie_row(movie, is_favourite)]
}

/// Components for a card inside a list. A one-item list gets no paginator.
pub fn page_components(page: &Page) -> Vec<CreateActionRow> {
    let mut rows = Vec::with_capacity(2);
    if page.len > 1 {
        rows.push(paginator_row(page.list, page.index));
    }
    rows.push(movie_row(&page.movie, page.is_favourite));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movie::fixtures::movie;

    fn json(rows: &[CreateActionRow]) -> String {
        serde_json::to_string(rows).unwrap()
    }

    fn page(len: usize) -> Page {
        Page {
            list: ListKind::Favourites,
            movie: movie(603, "The Matrix"),
            index: 0,
            len,
            is_favourite: true,
        }
    }

    #[test]
    fn paginator_carries_list_action_and_index() {
        let rows = page_components(&page(3));
        let json = json(&rows);

        assert_eq!(rows.len(), 2);
        assert!(json.contains("page:f:0:0"));
        assert!(json.contains("page:f:1:0"));
        assert!(json.contains("favourite:603"));
    }

    #[test]
    fn single_card_has_no_paginator() {
        let rows = page_components(&page(1));
        assert_eq!(rows.len(), 1);
        assert!(!json(&rows).contains("page:"));
    }

    #[test]
    fn trailer_link_only_when_known() {
        let mut matrix = movie(603, "The Matrix");
        assert!(!json(&movie_components(&matrix, false)).contains("youtube"));

        matrix.set_trailer("https://www.youtube.com/watch?v=vKQi3bBA1y8");
        assert!(json(&movie_components(&matrix, false))
            .contains("https://www.youtube.com/watch?v=vKQi3bBA1y8"));
    }
}
