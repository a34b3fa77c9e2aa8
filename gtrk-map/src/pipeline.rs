//! Map pipeline: fetch, aggregate, geocode, render

use crate::aggregate::build_location_index;
use crate::error::FetchError;
use crate::fetcher::ArtistCatalog;
use crate::geocode::{CachedGeocoder, Geocoder};
use crate::render::{self, MapView};
use tracing::info;

/// Build the map view.
///
/// Loading artists or the relation index is the only fatal step; every
/// per-location geocoding problem ends up in the failure count.
pub async fn build_map<G: Geocoder>(
    catalog: &ArtistCatalog,
    geocoder: &CachedGeocoder<G>,
    limit: Option<usize>,
) -> Result<MapView, FetchError> {
    info!("{}", render::STATUS_LOADING_ARTISTS);
    let artists = catalog.ensure_loaded().await?;

    info!("{}", render::STATUS_LOADING_RELATIONS);
    let relation = catalog.fetcher().relation().await?;

    let mut index = build_location_index(artists, &relation);
    if let Some(limit) = limit {
        index.truncate(limit);
    }

    info!("{}", render::status_geocoding(index.len()));
    let report = geocoder.geocode_buckets(&index).await;

    let view = MapView::from_report(&report);
    info!(cache_hits = report.cache_hits, "{}", view.status);

    Ok(view)
}
