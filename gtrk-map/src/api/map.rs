//! Map view endpoint

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::build_map;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MapQuery {
    /// Only geocode the first N locations
    pub limit: Option<usize>,

    /// `geojson` for a FeatureCollection, markers + bounds otherwise
    pub format: Option<String>,
}

/// GET /api/map?limit=&format=
///
/// Geocodes every location not already cached, so a cold call can take a
/// while because of the rate limit.
pub async fn map_view(
    State(state): State<AppState>,
    Query(query): Query<MapQuery>,
) -> ApiResult<Response> {
    let geojson = match query.format.as_deref() {
        None | Some("") | Some("markers") => false,
        Some("geojson") => true,
        Some(other) => return Err(ApiError::BadRequest(format!("unknown format '{}'", other))),
    };

    let view = build_map(&state.catalog, &state.geocoder, query.limit).await?;

    if geojson {
        Ok(Json(view.to_geojson()).into_response())
    } else {
        Ok(Json(view).into_response())
    }
}
