//! Location aggregation
//!
//! Joins the artist list with the relation index into one bucket per
//! concert location. Buckets are transient and never persisted.

use gtrk_common::models::{Artist, RelationIndex};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Artist as listed inside a bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistRef {
    pub id: u32,
    pub name: String,
    pub image: Option<String>,
}

/// Artists and dates for one concert location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationBucket {
    pub location: String,
    pub artists: Vec<ArtistRef>,
    /// Every date of every artist at this location, duplicates included
    pub dates: Vec<String>,
}

impl LocationBucket {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            artists: Vec::new(),
            dates: Vec::new(),
        }
    }

    /// Distinct dates, sorted
    pub fn unique_dates(&self) -> Vec<String> {
        self.dates
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Buckets keyed by location, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    buckets: Vec<LocationBucket>,
    positions: HashMap<String, usize>,
}

impl LocationIndex {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationBucket> {
        self.buckets.iter()
    }

    pub fn get(&self, location: &str) -> Option<&LocationBucket> {
        self.positions.get(location).map(|&i| &self.buckets[i])
    }

    /// Keep only the first `n` buckets
    pub fn truncate(&mut self, n: usize) {
        if n >= self.buckets.len() {
            return;
        }
        self.buckets.truncate(n);
        self.positions.retain(|_, i| *i < n);
    }

    fn bucket_mut(&mut self, location: &str) -> &mut LocationBucket {
        let idx = match self.positions.get(location) {
            Some(&idx) => idx,
            None => {
                self.buckets.push(LocationBucket::new(location));
                let idx = self.buckets.len() - 1;
                self.positions.insert(location.to_string(), idx);
                idx
            }
        };
        &mut self.buckets[idx]
    }
}

/// Build per-location buckets.
///
/// Relation entries for unknown artist ids are kept under a placeholder
/// name; artists without a relation entry simply do not appear.
pub fn build_location_index(artists: &[Artist], relation: &RelationIndex) -> LocationIndex {
    let by_id: HashMap<u32, &Artist> = artists.iter().map(|a| (a.id, a)).collect();
    let mut index = LocationIndex::default();

    for entry in &relation.index {
        let artist_ref = match by_id.get(&entry.id) {
            Some(artist) => ArtistRef {
                id: artist.id,
                name: artist.name.clone(),
                image: Some(artist.image.clone()).filter(|s| !s.is_empty()),
            },
            None => ArtistRef {
                id: entry.id,
                name: format!("Artist #{}", entry.id),
                image: None,
            },
        };

        for (location, dates) in entry.dates_locations.iter() {
            let bucket = index.bucket_mut(location);
            if !bucket.artists.iter().any(|a| a.id == artist_ref.id) {
                bucket.artists.push(artist_ref.clone());
            }
            bucket.dates.extend(dates.iter().cloned());
        }
    }

    index
}
