//! Audio preview lookup endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub artist: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub artist: String,
    /// `null` when no provider had a preview
    pub url: Option<String>,
}

/// GET /api/preview?artist=
pub async fn preview_url(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<PreviewResponse>> {
    let artist = query.artist.trim();
    if artist.is_empty() {
        return Err(ApiError::BadRequest("artist is required".to_string()));
    }

    let url = state.preview.resolve(artist).await;
    Ok(Json(PreviewResponse {
        artist: artist.to_string(),
        url,
    }))
}
