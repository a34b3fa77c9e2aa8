//! HTTP handlers for the read-only view server

pub mod artists;
pub mod health;
pub mod map;
pub mod preview;

pub use artists::{artist_detail, list_artists, suggest};
pub use health::health_routes;
pub use map::map_view;
pub use preview::preview_url;
