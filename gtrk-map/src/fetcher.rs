//! Groupie Trackers data fetcher
//!
//! Every endpoint is requested from the local proxy first; on any failure
//! (network, non-2xx status, undecodable body) the same resource is
//! requested once from the remote public API. There is no further retry.

use crate::error::FetchError;
use gtrk_common::config::{user_agent, TomlConfig};
use gtrk_common::models::{Artist, ArtistsPayload, DatesIndex, LocationsIndex, RelationIndex};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Groupie Trackers resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Artists,
    Locations,
    Dates,
    Relation,
}

impl Endpoint {
    /// Route on the local proxy
    pub fn proxy_path(&self) -> &'static str {
        match self {
            Endpoint::Artists => "/api/artists-proxy",
            Endpoint::Locations => "/api/locations-proxy",
            Endpoint::Dates => "/api/dates-proxy",
            Endpoint::Relation => "/api/relation-proxy",
        }
    }

    /// Route on the remote API, relative to its `/api` base
    pub fn remote_path(&self) -> &'static str {
        match self {
            Endpoint::Artists => "/artists",
            Endpoint::Locations => "/locations",
            Endpoint::Dates => "/dates",
            Endpoint::Relation => "/relation",
        }
    }
}

/// Where a payload was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Proxy,
    Remote,
}

/// Decoded payload plus the source that served it
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    pub source: Source,
}

/// HTTP client for the proxy and the remote API
pub struct DataFetcher {
    client: reqwest::Client,
    proxy_base: String,
    remote_base: String,
}

impl DataFetcher {
    pub fn new(
        proxy_base: impl Into<String>,
        remote_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            proxy_base: trim_base(proxy_base.into()),
            remote_base: trim_base(remote_base.into()),
        })
    }

    pub fn from_config(config: &TomlConfig) -> Result<Self, FetchError> {
        Self::new(
            config.proxy_base_url.clone(),
            config.remote_base_url.clone(),
            config.http_timeout(),
        )
    }

    /// Fetch and decode `endpoint`, falling back from proxy to remote once
    pub async fn fetch_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, FetchError> {
        self.fetch_json_with_source(endpoint).await.map(|f| f.value)
    }

    pub async fn fetch_json_with_source<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
    ) -> Result<Fetched<T>, FetchError> {
        let proxy_url = format!("{}{}", self.proxy_base, endpoint.proxy_path());
        let proxy_err = match self.get_json(&proxy_url).await {
            Ok(value) => {
                debug!(endpoint = ?endpoint, "Loaded from local proxy");
                return Ok(Fetched {
                    value,
                    source: Source::Proxy,
                });
            }
            Err(e) => e,
        };

        warn!(endpoint = ?endpoint, error = %proxy_err, "Local proxy failed, trying remote API");

        let remote_url = format!("{}{}", self.remote_base, endpoint.remote_path());
        match self.get_json(&remote_url).await {
            Ok(value) => {
                info!(endpoint = ?endpoint, "Loaded from remote API");
                Ok(Fetched {
                    value,
                    source: Source::Remote,
                })
            }
            Err(remote_err) => Err(FetchError::BothSourcesFailed {
                proxy: Box::new(proxy_err),
                remote: Box::new(remote_err),
            }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn artists(&self) -> Result<Vec<Artist>, FetchError> {
        let payload: ArtistsPayload = self.fetch_json(Endpoint::Artists).await?;
        Ok(payload.into_artists())
    }

    pub async fn relation(&self) -> Result<RelationIndex, FetchError> {
        self.fetch_json(Endpoint::Relation).await
    }

    pub async fn locations(&self) -> Result<LocationsIndex, FetchError> {
        self.fetch_json(Endpoint::Locations).await
    }

    pub async fn dates(&self) -> Result<DatesIndex, FetchError> {
        self.fetch_json(Endpoint::Dates).await
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// Artist list loaded once per process and reused afterwards
pub struct ArtistCatalog {
    fetcher: Arc<DataFetcher>,
    artists: OnceCell<Vec<Artist>>,
}

impl ArtistCatalog {
    pub fn new(fetcher: Arc<DataFetcher>) -> Self {
        Self {
            fetcher,
            artists: OnceCell::new(),
        }
    }

    /// Return the cached list, loading it on first use.
    ///
    /// A failed load is not cached; the next call tries again.
    pub async fn ensure_loaded(&self) -> Result<&[Artist], FetchError> {
        let artists = self
            .artists
            .get_or_try_init(|| async {
                let artists = self.fetcher.artists().await?;
                info!("Loaded {} artists", artists.len());
                Ok::<_, FetchError>(artists)
            })
            .await?;
        Ok(artists.as_slice())
    }

    pub async fn find(&self, id: u32) -> Result<Option<&Artist>, FetchError> {
        let artists = self.ensure_loaded().await?;
        Ok(artists.iter().find(|a| a.id == id))
    }

    pub fn fetcher(&self) -> &Arc<DataFetcher> {
        &self.fetcher
    }
}

/// Locations, dates and relation indexes used by the detail panel.
///
/// Each index degrades to empty when both sources fail.
#[derive(Debug, Clone, Default)]
pub struct Supplementary {
    pub locations: LocationsIndex,
    pub dates: DatesIndex,
    pub relation: RelationIndex,
}

impl Supplementary {
    pub async fn load(fetcher: &DataFetcher) -> Self {
        let (locations, dates, relation) =
            tokio::join!(fetcher.locations(), fetcher.dates(), fetcher.relation());

        Self {
            locations: locations.unwrap_or_else(|e| {
                warn!(error = %e, "Locations unavailable");
                LocationsIndex::default()
            }),
            dates: dates.unwrap_or_else(|e| {
                warn!(error = %e, "Dates unavailable");
                DatesIndex::default()
            }),
            relation: relation.unwrap_or_else(|e| {
                warn!(error = %e, "Relations unavailable");
                RelationIndex::default()
            }),
        }
    }
}
