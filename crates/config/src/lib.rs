//! Configuration management for the coaching session engine
//!
//! Supports loading configuration from:
//! - TOML files (config/default.toml plus an optional per-environment file)
//! - Environment variables (SALESCOACH_ prefix)
//!
//! Every tunable the engine recognizes lives here: segmenter thresholds,
//! advisory cadence, compliance flags, service endpoints, and server
//! settings. Defaults come from the `constants` module; `Settings::validate`
//! enforces the bounds the test suite pins.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AdvisorySettings, ComplianceSettings, ObservabilityConfig, RuntimeEnvironment,
    SegmenterSettings, ServerConfig, ServiceEndpoints, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
