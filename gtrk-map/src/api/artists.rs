//! Artist listing, detail and suggestions

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::fetcher::Supplementary;
use crate::render::{ArtistCard, ArtistDetail};
use crate::search::{self, QuickFilter};
use crate::AppState;

/// Query parameters for artist search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,

    /// Quick filter id (`rock`, `seventies`, `usa`, `month`)
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub filter: Option<QuickFilter>,
    /// Number of cards in `artists`
    pub total: usize,
    /// Matches left out because they lack a name or image
    pub skipped: usize,
    pub artists: Vec<ArtistCard>,
}

/// GET /api/artists?q=&filter=
pub async fn list_artists(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let filter = match query.filter.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<QuickFilter>().map_err(ApiError::BadRequest)?),
    };

    let artists = state.catalog.ensure_loaded().await?;
    let matches = search::search(artists, &query.q, filter);
    let found = matches.len();
    let cards: Vec<ArtistCard> = matches.into_iter().filter_map(ArtistCard::from_artist).collect();

    Ok(Json(SearchResponse {
        query: query.q.trim().to_string(),
        filter,
        total: cards.len(),
        skipped: found - cards.len(),
        artists: cards,
    }))
}

/// GET /api/artists/:id
pub async fn artist_detail(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Json<ArtistDetail>> {
    let artist = state
        .catalog
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("artist {}", id)))?;

    let extra = Supplementary::load(state.catalog.fetcher()).await;
    Ok(Json(ArtistDetail::build(artist, &extra)))
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

/// GET /api/suggestions?q=
pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> ApiResult<Json<SuggestResponse>> {
    let artists = state.catalog.ensure_loaded().await?;
    let suggestions = search::suggestions(artists, &query.q)
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Json(SuggestResponse { suggestions }))
}
