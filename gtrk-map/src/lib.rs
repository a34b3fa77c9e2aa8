//! gtrk-map library
//!
//! Fetches Groupie Trackers data (local proxy first, remote API as
//! fallback), aggregates concerts per location, geocodes locations with a
//! persistent cache, and produces view models for cards, detail panels and
//! map markers.

use axum::Router;
use std::sync::Arc;

pub mod aggregate;
pub mod api;
pub mod error;
pub mod fetcher;
pub mod geocode;
pub mod pipeline;
pub mod preview;
pub mod render;
pub mod search;
pub mod subscription;

use fetcher::ArtistCatalog;
use geocode::{CachedGeocoder, Geocoder};
use preview::PreviewResolver;

/// Geocoder type held by the view server
pub type SharedGeocoder = CachedGeocoder<Box<dyn Geocoder>>;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ArtistCatalog>,
    pub geocoder: Arc<SharedGeocoder>,
    pub preview: Arc<PreviewResolver>,
}

impl AppState {
    pub fn new(
        catalog: Arc<ArtistCatalog>,
        geocoder: Arc<SharedGeocoder>,
        preview: Arc<PreviewResolver>,
    ) -> Self {
        Self {
            catalog,
            geocoder,
            preview,
        }
    }
}

/// Build the read-only view router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/artists", get(api::list_artists))
        .route("/api/artists/:id", get(api::artist_detail))
        .route("/api/suggestions", get(api::suggest))
        .route("/api/map", get(api::map_view))
        .route("/api/preview", get(api::preview_url))
        .merge(api::health_routes())
        .with_state(state)
}
