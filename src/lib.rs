//! cianparser: a grid crawler for the Cian listing search API
//!
//! This crate splits an arbitrary polygon into map cells, collects the listing
//! IDs found in every cell and then fetches the full listing records, solving the
//! anti-bot challenge whenever the service starts redirecting requests to it.

pub mod api;
pub mod challenge;
pub mod config;
pub mod crawler;
pub mod geo;
pub mod output;

use std::sync::Arc;
use thiserror::Error;

/// Main error type for cianparser operations
#[derive(Debug, Error)]
pub enum CianError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Geometry error: {0}")]
    Geo(#[from] GeoError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Server sent unexpected status {status} for {url}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {source}, {body}")]
    Decode {
        url: String,
        source: serde_json::Error,
        body: String,
    },

    #[error("Can't solve captcha: {0}")]
    Challenge(#[source] Arc<challenge::ChallengeError>),

    #[error("Captcha still present at {url} after {attempts} attempts")]
    ChallengeNotResolved { url: String, attempts: usize },

    #[error("Request to {url} can't be replayed")]
    RequestNotReplayable { url: String },

    #[error("Offers batch size must be between 1 and {max}, got {size}")]
    InvalidBatchSize { size: usize, max: usize },

    #[error(transparent)]
    Pool(#[from] crawler::PoolError<CianError>),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid header in config: {0}")]
    InvalidHeader(String),
}

/// Geometry-specific errors
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Can't parse geojson: {0}")]
    Parse(#[from] geojson::Error),

    #[error("Geometry has no coordinates")]
    EmptyGeometry,

    #[error("Coordinate out of range: lat {lat}, lng {lng}")]
    CoordinateOutOfRange { lat: f64, lng: f64 },

    #[error("Cell size must be a positive number of meters, got {0}")]
    InvalidCellSize(f64),

    #[error("Grid of {count} cells exceeds the limit of {limit}, use a larger cell size")]
    TooManyCells { count: f64, limit: usize },
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for geometry operations
pub type GeoResult<T> = std::result::Result<T, GeoError>;

// Re-export commonly used types
pub use api::{ListingId, Offer};
pub use challenge::{ChallengeGate, GateState};
pub use config::Config;
pub use crawler::{Coordinator, Session, WorkerPool};
pub use geo::{parse_geojson, partition, GeoBounds};
