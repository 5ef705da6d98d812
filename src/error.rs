//! Error types for the fallible edges of the pipeline. Normalization and
//! scoring never fail; only configuration loading and the narrative
//! service can.

use thiserror::Error;

/// Configuration loading or validation error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the external narrative-generation service
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("narrative service is not configured: {0}")]
    NotConfigured(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("narrative service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not parse narrative response: {0}")]
    Parse(String),

    #[error("narrative service timed out after {0:?}")]
    Timeout(std::time::Duration),
}
