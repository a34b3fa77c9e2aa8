//! Audio preview URL lookup
//!
//! Asks the iTunes Search API first, then Deezer. Only the URL is resolved;
//! nothing is downloaded or played.

use gtrk_common::config::{user_agent, TomlConfig};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ITUNES_BASE_URL: &str = "https://itunes.apple.com";
pub const DEEZER_BASE_URL: &str = "https://api.deezer.com";

#[derive(Debug, Deserialize)]
struct ItunesResponse {
    #[serde(default)]
    results: Vec<ItunesTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesTrack {
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerResponse {
    #[serde(default)]
    data: Vec<DeezerTrack>,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    preview: Option<String>,
}

/// Upgrade `http://` preview links to `https://`
pub fn force_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

pub struct PreviewResolver {
    http_client: reqwest::Client,
    itunes_base: String,
    deezer_base: String,
    fallback_url: Option<String>,
}

impl PreviewResolver {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_bases(ITUNES_BASE_URL, DEEZER_BASE_URL, timeout)
    }

    pub fn with_bases(
        itunes_base: impl Into<String>,
        deezer_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            itunes_base: itunes_base.into().trim_end_matches('/').to_string(),
            deezer_base: deezer_base.into().trim_end_matches('/').to_string(),
            fallback_url: None,
        })
    }

    pub fn from_config(config: &TomlConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(config.http_timeout())?.with_fallback(config.preview_fallback_url.clone()))
    }

    /// URL returned when neither provider has a preview
    pub fn with_fallback(mut self, url: Option<String>) -> Self {
        self.fallback_url = url;
        self
    }

    /// First preview URL found, else the configured fallback.
    ///
    /// Provider failures are logged and never surface as errors.
    pub async fn resolve(&self, artist_name: &str) -> Option<String> {
        if let Some(url) = self.lookup_providers(artist_name).await {
            return Some(url);
        }
        if let Some(url) = &self.fallback_url {
            debug!(artist = %artist_name, url = %url, "Using fallback preview");
        }
        self.fallback_url.clone()
    }

    async fn lookup_providers(&self, artist_name: &str) -> Option<String> {
        match self.lookup_itunes(artist_name).await {
            Ok(Some(url)) => {
                info!(artist = %artist_name, "iTunes preview found");
                return Some(force_https(&url));
            }
            Ok(None) => debug!(artist = %artist_name, "No iTunes results"),
            Err(e) => warn!(artist = %artist_name, error = %e, "iTunes API error"),
        }

        match self.lookup_deezer(artist_name).await {
            Ok(Some(url)) => {
                info!(artist = %artist_name, "Deezer preview found");
                Some(force_https(&url))
            }
            Ok(None) => {
                debug!(artist = %artist_name, "No Deezer results");
                None
            }
            Err(e) => {
                warn!(artist = %artist_name, error = %e, "Deezer API error");
                None
            }
        }
    }

    async fn lookup_itunes(&self, artist_name: &str) -> Result<Option<String>, reqwest::Error> {
        let response: ItunesResponse = self
            .http_client
            .get(format!("{}/search", self.itunes_base))
            .query(&[
                ("term", artist_name),
                ("entity", "song"),
                ("limit", "1"),
                ("media", "music"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .results
            .into_iter()
            .next()
            .and_then(|t| t.preview_url)
            .filter(|u| !u.is_empty()))
    }

    async fn lookup_deezer(&self, artist_name: &str) -> Result<Option<String>, reqwest::Error> {
        let response: DeezerResponse = self
            .http_client
            .get(format!("{}/search", self.deezer_base))
            .query(&[("q", artist_name), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .data
            .into_iter()
            .next()
            .and_then(|t| t.preview)
            .filter(|u| !u.is_empty()))
    }
}
