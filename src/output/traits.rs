//! Output sink trait and error types
//!
//! This module defines the interface through which collected listings leave
//! the crawler.

use crate::api::Offer;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize offers: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives the listings of a finished crawl
pub trait OfferSink {
    /// Hands off every collected listing
    ///
    /// # Arguments
    ///
    /// * `collected_at` - When the crawl finished collecting
    /// * `offers` - The listings, in collection order
    fn write_offers(&mut self, collected_at: DateTime<Utc>, offers: &[Offer]) -> OutputResult<()>;
}
