//! # gtrk common library
//!
//! Shared code for the Groupie Trackers tools:
//! - Configuration loading (TOML + environment overrides)
//! - Wire models for the Groupie Trackers API
//! - SQLite key/value store used for geocode and subscription records
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
