//! Configuration loading
//!
//! Bootstrap configuration is resolved in this priority order:
//! 1. Command-line arguments (applied by the binary on top of the result)
//! 2. Environment variables (`GTRK_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Remote Groupie Trackers API (used as fallback when the local proxy fails)
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://groupietrackers.herokuapp.com/api";
/// Local proxy serving `/api/*-proxy` routes
pub const DEFAULT_PROXY_BASE_URL: &str = "http://localhost:8080";
/// Public Nominatim instance
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
/// Courtesy delay between two geocoding requests
pub const DEFAULT_GEOCODE_DELAY_MS: u64 = 250;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the SQLite database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base URL of the local proxy (routes `/api/<name>-proxy`)
    #[serde(default = "default_proxy_base_url")]
    pub proxy_base_url: String,

    /// Base URL of the remote Groupie Trackers API
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,

    /// Base URL of the Nominatim geocoding service
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Fixed minimum interval between two geocoding requests
    #[serde(default = "default_geocode_delay_ms")]
    pub geocode_delay_ms: u64,

    /// `Accept-Language` sent to the geocoder
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Total timeout for every outbound HTTP request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Port for `serve` mode
    #[serde(default = "default_port")]
    pub port: u16,

    /// Preview URL returned when no provider has one (none by default)
    #[serde(default)]
    pub preview_fallback_url: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gtrk"))
        .unwrap_or_else(|| PathBuf::from("./gtrk_data"))
}

fn default_proxy_base_url() -> String {
    DEFAULT_PROXY_BASE_URL.to_string()
}

fn default_remote_base_url() -> String {
    DEFAULT_REMOTE_BASE_URL.to_string()
}

fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_string()
}

fn default_geocode_delay_ms() -> u64 {
    DEFAULT_GEOCODE_DELAY_MS
}

fn default_accept_language() -> String {
    "fr".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            proxy_base_url: default_proxy_base_url(),
            remote_base_url: default_remote_base_url(),
            geocoder_url: default_geocoder_url(),
            geocode_delay_ms: default_geocode_delay_ms(),
            accept_language: default_accept_language(),
            http_timeout_secs: default_http_timeout_secs(),
            port: default_port(),
            preview_fallback_url: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from an explicit path or the platform config file.
    ///
    /// An explicit path that cannot be read or parsed is an error. When no
    /// path is given and the platform file does not exist, defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                warn!(
                    "Config file not found at {}, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply `GTRK_*` environment variable overrides
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(dir) = std::env::var("GTRK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("GTRK_PROXY_URL") {
            self.proxy_base_url = url;
        }
        if let Ok(url) = std::env::var("GTRK_REMOTE_URL") {
            self.remote_base_url = url;
        }
        if let Ok(url) = std::env::var("GTRK_GEOCODER_URL") {
            self.geocoder_url = url;
        }
        if let Ok(ms) = std::env::var("GTRK_GEOCODE_DELAY_MS") {
            self.geocode_delay_ms = ms.parse().map_err(|e| {
                Error::Config(format!("Invalid GTRK_GEOCODE_DELAY_MS '{}': {}", ms, e))
            })?;
        }
        if let Ok(url) = std::env::var("GTRK_PREVIEW_FALLBACK_URL") {
            self.preview_fallback_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Ok(port) = std::env::var("GTRK_PORT") {
            self.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid GTRK_PORT '{}': {}", port, e)))?;
        }
        Ok(self)
    }

    /// SQLite database file inside the data folder
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("gtrk.db")
    }

    pub fn geocode_delay(&self) -> Duration {
        Duration::from_millis(self.geocode_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// `<config dir>/gtrk/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gtrk").join("config.toml"))
}

/// User-Agent sent with every outbound request.
///
/// Nominatim's usage policy rejects anonymous clients.
pub fn user_agent() -> String {
    format!("gtrk/{} (+https://github.com/gtrk/gtrk)", env!("CARGO_PKG_VERSION"))
}
