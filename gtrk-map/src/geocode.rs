//! Location geocoding
//!
//! Free-text concert locations are resolved through Nominatim. Results are
//! cached in the key/value store under `geocode:<lowercased location>` with
//! no expiry. Network lookups are spaced by a fixed minimum interval to
//! respect the public service's usage policy; cache hits are never delayed.

use crate::aggregate::{LocationBucket, LocationIndex};
use async_trait::async_trait;
use gtrk_common::config::{user_agent, TomlConfig};
use gtrk_common::db::kv;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key prefix for cached coordinates
pub const CACHE_PREFIX: &str = "geocode:";

/// Geocoding errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Geocode failed: HTTP {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cache error: {0}")]
    Store(#[from] gtrk_common::Error),
}

/// WGS84 coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Resolves a free-text query to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// First match for `query`, or `None` when nothing matches
    async fn lookup(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    async fn lookup(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        (**self).lookup(query).await
    }
}

/// Enforces a fixed minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Geocoder rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// One Nominatim search result; coordinates arrive as strings
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Nominatim `/search` client
pub struct NominatimClient {
    http_client: reqwest::Client,
    base_url: String,
    accept_language: String,
    rate_limiter: RateLimiter,
}

impl NominatimClient {
    pub fn new(
        base_url: impl Into<String>,
        accept_language: impl Into<String>,
        min_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            accept_language: accept_language.into(),
            rate_limiter: RateLimiter::new(min_interval),
        })
    }

    pub fn from_config(config: &TomlConfig) -> Result<Self, GeocodeError> {
        Self::new(
            config.geocoder_url.clone(),
            config.accept_language.clone(),
            config.geocode_delay(),
            config.http_timeout(),
        )
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn lookup(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        self.rate_limiter.wait().await;

        let url = format!("{}/search", self.base_url);
        debug!(query = %query, "Querying Nominatim");

        let response = self
            .http_client
            .get(&url)
            .query(&[("format", "json"), ("q", query)])
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.accept_language)
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        // first result only, no disambiguation
        let Some(best) = places.into_iter().next() else {
            return Ok(None);
        };

        let lat = best
            .lat
            .parse::<f64>()
            .map_err(|e| GeocodeError::Parse(format!("lat '{}': {}", best.lat, e)))?;
        let lon = best
            .lon
            .parse::<f64>()
            .map_err(|e| GeocodeError::Parse(format!("lon '{}': {}", best.lon, e)))?;

        Ok(Some(GeoPoint { lat, lon }))
    }
}

/// Cache key for a location
pub fn cache_key(location: &str) -> String {
    format!("{}{}", CACHE_PREFIX, location.to_lowercase())
}

/// Outcome of a single resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub point: Option<GeoPoint>,
    pub from_cache: bool,
}

/// A geocoded bucket
#[derive(Debug, Clone)]
pub struct Placed {
    pub bucket: LocationBucket,
    pub point: GeoPoint,
}

/// Result of geocoding every bucket
#[derive(Debug, Clone, Default)]
pub struct GeocodeReport {
    pub placed: Vec<Placed>,
    pub success: usize,
    pub failures: usize,
    /// Lookups answered from the cache
    pub cache_hits: usize,
}

/// Geocoder backed by the persistent cache
pub struct CachedGeocoder<G> {
    inner: G,
    pool: SqlitePool,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, pool: SqlitePool) -> Self {
        Self { inner, pool }
    }

    /// Cache first, then the network; only found points are stored
    pub async fn resolve(&self, location: &str) -> Result<Resolved, GeocodeError> {
        let key = cache_key(location);

        match kv::get_json::<GeoPoint>(&self.pool, &key).await {
            Ok(Some(point)) => {
                return Ok(Resolved {
                    point: Some(point),
                    from_cache: true,
                })
            }
            Ok(None) => {}
            Err(e) => {
                // undecodable entry: treat as a miss and overwrite it
                debug!(location = %location, error = %e, "Ignoring unreadable cache entry");
            }
        }

        let point = self.inner.lookup(location).await?;
        if let Some(point) = point {
            kv::set_json(&self.pool, &key, &point).await?;
        }

        Ok(Resolved {
            point,
            from_cache: false,
        })
    }

    /// Geocode every bucket sequentially.
    ///
    /// Errors and empty results each count as one failure; nothing is retried.
    pub async fn geocode_buckets(&self, index: &LocationIndex) -> GeocodeReport {
        let mut report = GeocodeReport::default();

        for bucket in index.iter() {
            match self.resolve(&bucket.location).await {
                Ok(Resolved {
                    point: Some(point),
                    from_cache,
                }) => {
                    if from_cache {
                        report.cache_hits += 1;
                    }
                    report.success += 1;
                    report.placed.push(Placed {
                        bucket: bucket.clone(),
                        point,
                    });
                }
                Ok(Resolved { point: None, .. }) => {
                    warn!(location = %bucket.location, "No geocoding result");
                    report.failures += 1;
                }
                Err(e) => {
                    warn!(location = %bucket.location, error = %e, "Geocoding failed");
                    report.failures += 1;
                }
            }
        }

        report
    }

    /// Number of cached locations
    pub async fn cached_count(&self) -> Result<i64, GeocodeError> {
        Ok(kv::count_prefix(&self.pool, CACHE_PREFIX).await?)
    }

    /// Drop every cached location
    pub async fn clear_cache(&self) -> Result<u64, GeocodeError> {
        Ok(kv::clear_prefix(&self.pool, CACHE_PREFIX).await?)
    }
}
