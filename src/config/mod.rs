//! Configuration management for crawlbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use crawlbox::config::Settings;
//!
//! let settings = Settings::load().expect("Failed to load configuration");
//! println!("Store path: {}", settings.store.path.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `CRAWLBOX__<section>__<key>`
//!
//! Examples:
//! - `CRAWLBOX__STORE__PATH=/var/lib/crawlbox`
//! - `CRAWLBOX__JOB__CONCURRENCY=16`
//! - `CRAWLBOX__JOB__INTERVAL=500ms`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/crawlbox.toml`.
//! This can be overridden using the `CRAWLBOX_CONFIG` environment variable.
//!
//! Job definitions themselves ([`JobConfig`]) are built in code; the `[job]`
//! section only supplies process-wide defaults for their options.

mod job;
mod models;
mod sources;
mod validation;

pub use job::{JobConfig, JobOptions};
pub use models::{HttpSettings, LoggingSettings, Settings, StoreBackend, StoreSettings};
pub use validation::{ValidationError, validate_job};

pub(crate) use models::default_key_prefix;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Settings {
    /// Load settings from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = sources::load()?;
        validation::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let settings = sources::load_from_sources(path)?;
        validation::validate(&settings)?;
        Ok(settings)
    }

    /// Job with the configured option defaults
    pub fn job(&self, name: impl Into<String>) -> JobConfig {
        JobConfig {
            name: name.into(),
            options: self.job.clone(),
        }
    }
}
