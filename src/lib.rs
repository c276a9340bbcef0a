//! Import archived ADS-B snapshots into PostGIS

pub mod archive;
pub mod config;
pub mod database;
pub mod errors;
pub mod importer;
pub mod models;
pub mod timestamps;
