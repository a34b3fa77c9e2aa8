//! Groupie Trackers API wire models
//!
//! All records are read-only snapshots of the remote API.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Artist (or band) as returned by `/api/artists`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Cover image URL
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub members: Vec<String>,
    /// Year the band was formed
    #[serde(default)]
    pub creation_date: Option<i32>,
    /// First album release date, `dd-mm-yyyy`
    #[serde(default)]
    pub first_album: Option<String>,
    /// URL of the artist's locations record
    #[serde(default)]
    pub locations: Option<String>,
    /// URL of the artist's dates record
    #[serde(default)]
    pub concert_dates: Option<String>,
    /// URL of the artist's relation record
    #[serde(default)]
    pub relations: Option<String>,
}

/// `/api/artists` payload: a bare array, or an object wrapping it
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArtistsPayload {
    List(Vec<Artist>),
    Wrapped {
        #[serde(default)]
        artists: Vec<Artist>,
    },
}

impl ArtistsPayload {
    pub fn into_artists(self) -> Vec<Artist> {
        match self {
            ArtistsPayload::List(artists) => artists,
            ArtistsPayload::Wrapped { artists } => artists,
        }
    }
}

/// One artist's relation record: location → concert dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEntry {
    pub id: u32,
    #[serde(default)]
    pub dates_locations: DatesLocations,
}

/// Location → concert dates, kept in the order the API lists the locations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatesLocations(Vec<(String, Vec<String>)>);

impl DatesLocations {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(loc, dates)| (loc.as_str(), dates.as_slice()))
    }

    pub fn get(&self, location: &str) -> Option<&[String]> {
        self.iter().find(|(loc, _)| *loc == location).map(|(_, dates)| dates)
    }

    /// A repeated location replaces the earlier dates in place
    pub fn insert(&mut self, location: String, dates: Vec<String>) {
        match self.0.iter_mut().find(|(loc, _)| *loc == location) {
            Some(slot) => slot.1 = dates,
            None => self.0.push((location, dates)),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for DatesLocations {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (location, dates) in iter {
            map.insert(location, dates);
        }
        map
    }
}

impl Serialize for DatesLocations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (location, dates) in &self.0 {
            map.serialize_entry(location, dates)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DatesLocations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = DatesLocations;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of location to date list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = DatesLocations::default();
                while let Some((location, dates)) = access.next_entry::<String, Vec<String>>()? {
                    map.insert(location, dates);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// `/api/relation` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationIndex {
    #[serde(default)]
    pub index: Vec<RelationEntry>,
}

impl RelationIndex {
    pub fn for_artist(&self, id: u32) -> Option<&RelationEntry> {
        self.index.iter().find(|e| e.id == id)
    }
}

/// One artist's concert locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub id: u32,
    #[serde(default)]
    pub locations: Vec<String>,
    /// URL of the matching dates record
    #[serde(default)]
    pub dates: Option<String>,
}

/// `/api/locations` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationsIndex {
    #[serde(default)]
    pub index: Vec<LocationEntry>,
}

impl LocationsIndex {
    pub fn for_artist(&self, id: u32) -> Option<&LocationEntry> {
        self.index.iter().find(|e| e.id == id)
    }
}

/// One artist's concert dates; a leading `*` marks the first date of a tour leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatesEntry {
    pub id: u32,
    #[serde(default)]
    pub dates: Vec<String>,
}

/// `/api/dates` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatesIndex {
    #[serde(default)]
    pub index: Vec<DatesEntry>,
}

impl DatesIndex {
    pub fn for_artist(&self, id: u32) -> Option<&DatesEntry> {
        self.index.iter().find(|e| e.id == id)
    }
}
