//! View models for cards, map markers and the artist detail panel
//!
//! Produces plain data (and escaped HTML fragments for marker popups);
//! layout and styling belong to whatever displays them.

use crate::aggregate::{ArtistRef, LocationBucket};
use crate::fetcher::Supplementary;
use crate::geocode::{GeoPoint, GeocodeReport};
use gtrk_common::models::Artist;
use serde::Serialize;
use serde_json::{json, Value};

/// Padding ratio applied to the marker bounds on each side
pub const BOUNDS_PADDING: f64 = 0.2;

/// `north_carolina-usa` → `North Carolina, Usa`
pub fn format_location_name(location: &str) -> String {
    let formatted = location.replace('_', " ").replace('-', ", ");
    formatted
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `*23-08-2019` → `23/08/2019`
pub fn format_date_label(date: &str) -> String {
    date.strip_prefix('*').unwrap_or(date).replace('-', "/")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Popup body for a map marker
pub fn popup_html(bucket: &LocationBucket) -> String {
    let artists: String = bucket
        .artists
        .iter()
        .map(|a| {
            let name = escape_html(&a.name);
            let img = match &a.image {
                Some(src) => format!("<img src=\"{}\" alt=\"{}\" />", escape_html(src), name),
                None => String::new(),
            };
            format!("<li>{}<span>{}</span></li>", img, name)
        })
        .collect();

    let dates: String = bucket
        .unique_dates()
        .iter()
        .map(|d| format!("<li>{}</li>", escape_html(d)))
        .collect();

    format!(
        "<div class=\"popup\"><h3>{}</h3><h4>Artists</h4><ul class=\"artists\">{}</ul><h4>Dates</h4><ul class=\"dates\">{}</ul></div>",
        escape_html(&bucket.location),
        artists,
        dates
    )
}

/// One map marker
#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub location: String,
    pub label: String,
    pub lat: f64,
    pub lon: f64,
    pub artists: Vec<ArtistRef>,
    /// Distinct dates, sorted
    pub dates: Vec<String>,
    pub popup_html: String,
}

impl Marker {
    pub fn new(bucket: &LocationBucket, point: GeoPoint) -> Self {
        Self {
            location: bucket.location.clone(),
            label: format_location_name(&bucket.location),
            lat: point.lat,
            lon: point.lon,
            artists: bucket.artists.clone(),
            dates: bucket.unique_dates(),
            popup_html: popup_html(bucket),
        }
    }
}

/// South-west / north-east corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box containing every point; `None` for no points
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Bounds {
                    south: p.lat,
                    west: p.lon,
                    north: p.lat,
                    east: p.lon,
                },
                Some(b) => Bounds {
                    south: b.south.min(p.lat),
                    west: b.west.min(p.lon),
                    north: b.north.max(p.lat),
                    east: b.east.max(p.lon),
                },
            })
        })
    }

    /// Extend each side by `ratio` times the box size
    pub fn pad(self, ratio: f64) -> Self {
        let lat_pad = (self.north - self.south) * ratio;
        let lon_pad = (self.east - self.west) * ratio;
        Bounds {
            south: self.south - lat_pad,
            west: self.west - lon_pad,
            north: self.north + lat_pad,
            east: self.east + lon_pad,
        }
    }
}

/// Everything a map needs to draw
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub markers: Vec<Marker>,
    pub bounds: Option<Bounds>,
    pub success: usize,
    pub failures: usize,
    pub status: String,
}

impl MapView {
    pub fn from_report(report: &GeocodeReport) -> Self {
        let markers: Vec<Marker> = report
            .placed
            .iter()
            .map(|p| Marker::new(&p.bucket, p.point))
            .collect();

        let bounds = Bounds::from_points(markers.iter().map(|m| GeoPoint {
            lat: m.lat,
            lon: m.lon,
        }))
        .map(|b| b.pad(BOUNDS_PADDING));

        Self {
            markers,
            bounds,
            success: report.success,
            failures: report.failures,
            status: status_ready(report.success, report.failures),
        }
    }

    /// GeoJSON FeatureCollection; coordinates are `[lon, lat]`
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .markers
            .iter()
            .map(|m| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [m.lon, m.lat],
                    },
                    "properties": {
                        "location": m.location,
                        "label": m.label,
                        "artists": m.artists,
                        "dates": m.dates,
                        "popup": m.popup_html,
                    }
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

pub const STATUS_LOADING_ARTISTS: &str = "Loading artists…";
pub const STATUS_LOADING_RELATIONS: &str = "Loading relations (locations + dates)…";
pub const STATUS_LOAD_ERROR: &str = "Error loading data.";

pub fn status_geocoding(count: usize) -> String {
    format!("Geocoding {} locations…", count)
}

pub fn status_ready(success: usize, failures: usize) -> String {
    format!("Markers ready: {}. Failures: {}.", success, failures)
}

/// Artist card for grids and search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistCard {
    pub id: u32,
    pub name: String,
    pub image: String,
    pub creation_date: Option<i32>,
    pub first_album: Option<String>,
    pub member_count: usize,
}

impl ArtistCard {
    /// `None` when the artist has no name or no image
    pub fn from_artist(artist: &Artist) -> Option<Self> {
        if artist.name.trim().is_empty() || artist.image.trim().is_empty() {
            return None;
        }
        Some(Self {
            id: artist.id,
            name: artist.name.clone(),
            image: artist.image.clone(),
            creation_date: artist.creation_date,
            first_album: artist.first_album.clone(),
            member_count: artist.members.len(),
        })
    }
}

/// Cards for every renderable artist, skipping the rest
pub fn render_cards(artists: &[Artist]) -> Vec<ArtistCard> {
    artists.iter().filter_map(ArtistCard::from_artist).collect()
}

/// One location and its dates in the detail panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationRow {
    pub location: String,
    pub dates: Vec<String>,
}

/// Detail panel for one artist
#[derive(Debug, Clone, Serialize)]
pub struct ArtistDetail {
    pub id: u32,
    pub name: String,
    pub image: Option<String>,
    pub members: Vec<String>,
    pub creation_date: Option<i32>,
    pub first_album: Option<String>,
    /// Formatted location names; `None` when unavailable
    pub locations: Option<Vec<String>>,
    /// Formatted date labels; `None` when unavailable
    pub dates: Option<Vec<String>>,
    /// Dates per location; `None` when unavailable
    pub relations: Option<Vec<RelationRow>>,
}

impl ArtistDetail {
    pub fn build(artist: &Artist, extra: &Supplementary) -> Self {
        let locations = extra
            .locations
            .for_artist(artist.id)
            .map(|e| e.locations.iter().map(|l| format_location_name(l)).collect());

        let dates = extra
            .dates
            .for_artist(artist.id)
            .map(|e| e.dates.iter().map(|d| format_date_label(d)).collect());

        let relations = extra.relation.for_artist(artist.id).map(|e| {
            e.dates_locations
                .iter()
                .map(|(loc, dates)| RelationRow {
                    location: format_location_name(loc),
                    dates: dates.iter().map(|d| format_date_label(d)).collect(),
                })
                .collect()
        });

        Self {
            id: artist.id,
            name: if artist.name.is_empty() {
                "Artist".to_string()
            } else {
                artist.name.clone()
            },
            image: Some(artist.image.clone()).filter(|s| !s.is_empty()),
            members: artist.members.clone(),
            creation_date: artist.creation_date,
            first_album: artist.first_album.clone(),
            locations,
            dates,
            relations,
        }
    }
}
