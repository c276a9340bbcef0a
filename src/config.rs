//! Application configuration

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::ImporterError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub archive: ArchiveConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// Remote snapshot archive
#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Directory URL of one archived day, without trailing slash
    pub base_url: String,
    /// Timeout of a single snapshot request
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
    /// Skip TLS certificate verification when fetching snapshots
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ImportConfig {
    /// Stop after this many snapshots; the full day when unset
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/default")
    }

    /// Load configuration from an optional file, overridden by environment
    /// variables such as `ADSBIMPORT__DATABASE__URL`.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("archive.timeout", 10)?
            .set_default("archive.accept_invalid_certs", true)?
            .set_default("database.run_migrations", false)?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("ADSBIMPORT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ImporterError> {
        self.archive.validate()?;
        self.database.validate()?;
        self.import.validate()?;
        Ok(())
    }
}

impl ArchiveConfig {
    fn validate(&self) -> Result<(), ImporterError> {
        if self.base_url.trim().is_empty() {
            return Err(ImporterError::ConfigurationError {
                message: "Archive base URL cannot be empty".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ImporterError::ConfigurationError {
                message: "Archive timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), ImporterError> {
        if self.url.trim().is_empty() {
            return Err(ImporterError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl ImportConfig {
    fn validate(&self) -> Result<(), ImporterError> {
        if self.limit == Some(0) {
            return Err(ImporterError::ConfigurationError {
                message: "Import limit must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
