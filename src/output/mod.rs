//! Output module for handing collected listings downstream
//!
//! This module handles:
//! - The sink interface the crawl hands its results to
//! - Writing listings to a JSON file

mod json;
mod traits;

pub use json::JsonFileSink;
pub use traits::{OfferSink, OutputError, OutputResult};
