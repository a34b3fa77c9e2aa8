//! SQLite storage
//!
//! A single key/value table plays the role of browser storage: geocode
//! results (`geocode:<location>`) and the subscription record
//! (`groupie_subscription`) live here.

pub mod init;
pub mod kv;

pub use init::{init_database, init_memory_database};
