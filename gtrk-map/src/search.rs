//! Artist search, quick filters and suggestions

use gtrk_common::models::Artist;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Results shown for an empty query
pub const DEFAULT_RESULT_COUNT: usize = 24;
/// Maximum number of suggestions
pub const MAX_SUGGESTIONS: usize = 5;
/// Suggestions start after this many characters
pub const MIN_SUGGESTION_CHARS: usize = 2;
/// Artists shown on the home grid
pub const HOME_COUNT: usize = 12;

const ROCK_WORDS: [&str; 4] = ["rock", "metal", "punk", "roll"];

/// Quick-filter chips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickFilter {
    Rock,
    Seventies,
    Usa,
    Month,
}

impl FromStr for QuickFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rock" => Ok(QuickFilter::Rock),
            "seventies" => Ok(QuickFilter::Seventies),
            "usa" => Ok(QuickFilter::Usa),
            "month" => Ok(QuickFilter::Month),
            other => Err(format!("unknown filter '{}'", other)),
        }
    }
}

impl QuickFilter {
    pub fn matches(&self, artist: &Artist) -> bool {
        match self {
            QuickFilter::Rock => {
                let name = artist.name.to_lowercase();
                ROCK_WORDS.iter().any(|w| name.contains(w))
            }
            QuickFilter::Seventies => {
                let in_seventies = |year: i32| (1970..1980).contains(&year);
                artist.creation_date.is_some_and(in_seventies)
                    || first_album_year(artist).is_some_and(in_seventies)
            }
            // artist records carry no location or precise date, keep everything
            QuickFilter::Usa | QuickFilter::Month => true,
        }
    }
}

/// Year from the last four characters of `firstAlbum` (`dd-mm-yyyy`)
fn first_album_year(artist: &Artist) -> Option<i32> {
    let album = artist.first_album.as_deref()?;
    let chars: Vec<char> = album.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect::<String>().parse().ok()
}

/// Clicking the active chip clears it; clicking another one selects it
pub fn toggle_filter(active: Option<QuickFilter>, clicked: QuickFilter) -> Option<QuickFilter> {
    if active == Some(clicked) {
        None
    } else {
        Some(clicked)
    }
}

/// Case-insensitive name search, then the quick filter.
///
/// An empty query yields the first [`DEFAULT_RESULT_COUNT`] artists.
pub fn search<'a>(artists: &'a [Artist], query: &str, filter: Option<QuickFilter>) -> Vec<&'a Artist> {
    let q = query.trim().to_lowercase();

    let candidates: Vec<&Artist> = if q.is_empty() {
        artists.iter().take(DEFAULT_RESULT_COUNT).collect()
    } else {
        artists
            .iter()
            .filter(|a| a.name.to_lowercase().contains(&q))
            .collect()
    };

    match filter {
        Some(f) => candidates.into_iter().filter(|a| f.matches(a)).collect(),
        None => candidates,
    }
}

/// Names starting with `prefix`, at most [`MAX_SUGGESTIONS`]
pub fn suggestions<'a>(artists: &'a [Artist], prefix: &str) -> Vec<&'a str> {
    let q = prefix.trim().to_lowercase();
    if q.chars().count() < MIN_SUGGESTION_CHARS {
        return Vec::new();
    }

    artists
        .iter()
        .filter(|a| a.name.to_lowercase().starts_with(&q))
        .take(MAX_SUGGESTIONS)
        .map(|a| a.name.as_str())
        .collect()
}

/// Home grid: first [`HOME_COUNT`] artists and whether more exist
pub fn home_listing(artists: &[Artist]) -> (&[Artist], bool) {
    let shown = artists.len().min(HOME_COUNT);
    (&artists[..shown], artists.len() > HOME_COUNT)
}
