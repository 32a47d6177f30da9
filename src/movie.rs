use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discord user identifier as seen by the core.
pub type UserId = u64;

/// Provider-assigned movie identifier.
pub type MovieId = u64;

/// Text shown when the provider has no overview for a movie.
pub const MISSING_OVERVIEW: &str = "No description available.";

/// Placeholder image used when the provider has no poster.
pub const POSTER_PLACEHOLDER_URL: &str = "https://placehold.co/550x825";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Normalized movie record.
///
/// Values are only built by the metadata source (or read back from storage),
/// so the invariants below always hold:
///
/// - `title` and `original_title` are non-empty; each falls back to the other.
/// - `poster_path` is an absolute URL or [`POSTER_PLACEHOLDER_URL`].
/// - `trailer` is written at most once, see [`Movie::set_trailer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub poster_path: String,
    pub genre_ids: Vec<u64>,
    pub release_date: Option<NaiveDate>,
    pub average_rating: f64,
    pub vote_count: u64,
    #[serde(default)]
    pub trailer: Option<String>,
}

impl Movie {
    /// Records a resolved trailer URL.
    ///
    /// Returns `false` and leaves the movie untouched when a trailer is
    /// already present.
    pub fn set_trailer(&mut self, url: impl Into<String>) -> bool {
        if self.trailer.is_some() {
            return false;
        }
        self.trailer = Some(url.into());
        true
    }
}

/// Window used by the provider's trending endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Some(TimeWindow::Day),
            "week" => Some(TimeWindow::Week),
            _ => None,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::movie;
    use super::*;

    #[test]
    fn trailer_is_written_once() {
        let mut matrix = movie(603, "The Matrix");
        assert!(matrix.set_trailer("https://www.youtube.com/watch?v=first"));
        assert!(!matrix.set_trailer("https://www.youtube.com/watch?v=second"));
        assert_eq!(
            matrix.trailer.as_deref(),
            Some("https://www.youtube.com/watch?v=first")
        );
    }

    #[test]
    fn time_window_parsing() {
        assert_eq!(TimeWindow::parse("Week"), Some(TimeWindow::Week));
        assert_eq!(TimeWindow::parse(" day "), Some(TimeWindow::Day));
        assert_eq!(TimeWindow::parse("month"), None);
    }
}
