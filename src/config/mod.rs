//! Configuration management for scrapewatch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use scrapewatch::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Backend: {}", config.api.base_url);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SCRAPEWATCH__<section>__<key>`
//!
//! Examples:
//! - `SCRAPEWATCH__API__BASE_URL=http://scraper:5000`
//! - `SCRAPEWATCH__POLLING__STATUS_INTERVAL=2s`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/scrapewatch.toml`.
//! This can be overridden using the `SCRAPEWATCH_CONFIG` environment variable
//! or the `--config` flag.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{ApiConfig, Config, DraftsConfig, ExportConfig, PollingConfig};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`SCRAPEWATCH__*`)
    /// 2. TOML file (`explicit`, else `SCRAPEWATCH_CONFIG`, else `config/scrapewatch.toml`)
    /// 3. Default values
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(explicit)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration rendered back to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
