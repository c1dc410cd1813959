//! Configuration management for courtfetch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use courtfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Daily budget: {}", config.discovery.daily_budget);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `COURTFETCH__<section>__<key>`
//!
//! Examples:
//! - `COURTFETCH__DISCOVERY__ENABLED=true`
//! - `COURTFETCH__DISCOVERY__DAILY_BUDGET=5.00`
//! - `COURTFETCH__DISCOVERY__ALLOWED_COURTS=cacd,nysd`
//!
//! Account credentials are read only from `PACER_USERNAME`, `PACER_PASSWORD`,
//! `PACER_CLIENT_CODE` and `PACER_OTP_CODE`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/courtfetch.toml`.
//! This can be overridden using the `COURTFETCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    Config, DiscoveryConfig, PacerConfig, PacerCredentials, ServerConfig, StorageConfig,
    StorageProvider,
};
pub use validation::ValidationError;

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
    /// 1. Environment variables (`COURTFETCH__*`)
    /// 2. TOML file (default: `config/courtfetch.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load from `path`, or the default lookup when `None`, including
    /// account secrets from the environment.
    pub fn load_with(path: Option<std::path::PathBuf>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => sources::load_file(path)?,
            None => sources::load()?,
        };
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// The effective configuration as TOML. Credentials are never included.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
