//! Crawler module for listing collection
//!
//! This module contains the core crawling logic, including:
//! - HTTP session and API calls behind the challenge gate
//! - The bounded-concurrency worker pool
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod pool;

pub use coordinator::{batches, dedup_ids, Coordinator};
pub use fetcher::{
    build_http_client, read_json, truncate_body, CianApi, Endpoints, Session, CAPTCHA_PATH,
    CLUSTERS_PATH, OFFERS_PATH,
};
pub use pool::{PoolError, ProgressFn, WorkerFailure, WorkerPool};

use crate::api::Offer;
use crate::config::Config;
use crate::CianError;
use geo::Geometry;

/// Runs a complete crawl over an area
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP session and captcha solver
/// 2. Partition the area and collect listing IDs cell by cell
/// 3. Fetch the full listing records in batches
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `area` - Search area in lon/lat degrees
///
/// # Returns
///
/// * `Ok(Vec<Offer>)` - Every listing found in the area
/// * `Err(CianError)` - Crawl failed
pub async fn crawl(config: &Config, area: &Geometry<f64>) -> Result<Vec<Offer>, CianError> {
    Coordinator::new(config)?.run(area).await
}
