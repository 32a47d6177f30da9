//! Button tokens and index arithmetic for browsing a movie list.
//!
//! Pagination is stateless on the chat side: each button carries the list
//! kind, the action and the index currently shown. The list itself is
//! re-resolved on every step (see `Catalog::resolve_active_list`).

use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::movie::MovieId;

const PAGE_PREFIX: &str = "page";
const FAVOURITE_PREFIX: &str = "favourite";

/// Which per-user list a paginator browses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Trending,
    Favourites,
}

impl ListKind {
    fn code(self) -> &'static str {
        match self {
            ListKind::Trending => "t",
            ListKind::Favourites => "f",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "t" => Some(ListKind::Trending),
            "f" => Some(ListKind::Favourites),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Prev,
    Next,
}

impl PageAction {
    fn code(self) -> u8 {
        match self {
            PageAction::Prev => 0,
            PageAction::Next => 1,
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(PageAction::Prev),
            "1" => Some(PageAction::Next),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("unknown button id '{0}'")]
    Unknown(String),

    #[error("malformed button id '{0}'")]
    Malformed(String),
}

/// `page:<list>:<action>:<index>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationToken {
    pub list: ListKind,
    pub action: PageAction,
    pub current_index: usize,
}

impl PaginationToken {
    pub fn new(list: ListKind, action: PageAction, current_index: usize) -> Self {
        Self {
            list,
            action,
            current_index,
        }
    }

    /// Index this token leads to in a list of `len` items, wrapping at both
    /// ends. `None` for an empty list.
    pub fn target_index(&self, len: usize) -> Option<usize> {
        next_index(self.current_index, self.action, len)
    }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            PAGE_PREFIX,
            self.list.code(),
            self.action.code(),
            self.current_index
        )
    }
}

/// `favourite:<movie id>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavouriteToken {
    pub movie_id: MovieId,
}

impl fmt::Display for FavouriteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", FAVOURITE_PREFIX, self.movie_id)
    }
}

/// Any button this bot emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonToken {
    Page(PaginationToken),
    Favourite(FavouriteToken),
}

impl FromStr for ButtonToken {
    type Err = TokenError;

    fn from_str(custom_id: &str) -> Result<Self, Self::Err> {
        let mut parts = custom_id.split(':');
        let malformed = || TokenError::Malformed(custom_id.to_string());

        match parts.next() {
            Some(PAGE_PREFIX) => {
                let list = parts.next().and_then(ListKind::from_code).ok_or_else(malformed)?;
                let action = parts.next().and_then(PageAction::from_code).ok_or_else(malformed)?;
                let current_index = parts
                    .next()
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or_else(malformed)?;
                if parts.next().is_some() {
                    return Err(malformed());
                }
                Ok(ButtonToken::Page(PaginationToken::new(list, action, current_index)))
            }
            Some(FAVOURITE_PREFIX) => {
                let movie_id = parts
                    .next()
                    .and_then(|s| s.parse::<MovieId>().ok())
                    .ok_or_else(malformed)?;
                if parts.next().is_some() {
                    return Err(malformed());
                }
                Ok(ButtonToken::Favourite(FavouriteToken { movie_id }))
            }
            _ => Err(TokenError::Unknown(custom_id.to_string())),
        }
    }
}

/// `(current ± 1) mod len`, Euclidean so PREV from 0 lands on the last item.
/// A `current` past the end (the list shrank) is reduced first.
pub fn next_index(current: usize, action: PageAction, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let current = current % len;
    Some(match action {
        PageAction::Next => (current + 1) % len,
        PageAction::Prev => (current + len - 1) % len,
    })
}
