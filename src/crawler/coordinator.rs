//! Crawl coordinator: the two crawl phases
//!
//! This module drives a crawl end to end:
//! - Partitioning the search area into cells
//! - Querying every cell for listing clusters and collecting unique listing IDs
//! - Fetching full listing records for those IDs in fixed-size batches
//!
//! Both phases fan out through [`WorkerPool`] and every request goes through
//! the challenge gate, so a captcha hit by any worker is solved once for all.

use crate::api::{JsonQuery, ListingId, Offer};
use crate::challenge::{CaptchaSolver, ChallengeGate, RuCaptchaSolver};
use crate::config::{Config, SearchConfig, MAX_OFFERS_BATCH_SIZE};
use crate::crawler::fetcher::{CianApi, Session};
use crate::crawler::pool::WorkerPool;
use crate::geo::{partition, GeoBounds};
use crate::{CianError, ConfigError};
use geo::Geometry;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Main crawl coordinator
pub struct Coordinator {
    api: Arc<CianApi>,
    search: SearchConfig,
}

impl Coordinator {
    /// Creates a coordinator with an HTTP session and the rucaptcha solver
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to crawl
    /// * `Err(CianError)` - The HTTP client or solver could not be built
    pub fn new(config: &Config) -> Result<Self, CianError> {
        let session = Session::new(&config.http)?;
        let solver = RuCaptchaSolver::new(&config.captcha)
            .map_err(|e| ConfigError::Validation(format!("captcha: {}", e)))?;

        Ok(Self::with_solver(
            session,
            Arc::new(solver),
            config.search.clone(),
        ))
    }

    /// Creates a coordinator around an existing session and solver
    pub fn with_solver(
        session: Session,
        solver: Arc<dyn CaptchaSolver>,
        search: SearchConfig,
    ) -> Self {
        let query = JsonQuery::new(search.search_type.clone(), search.query.clone());
        let gate = ChallengeGate::new(session, solver);

        Self {
            api: Arc::new(CianApi::new(gate, query)),
            search,
        }
    }

    pub fn gate(&self) -> &ChallengeGate {
        self.api.gate()
    }

    /// Runs both phases with the configured cell size, batch size and workers
    pub async fn run(&self, geometry: &Geometry<f64>) -> Result<Vec<Offer>, CianError> {
        let ids = self
            .collect_ids(
                geometry,
                self.search.max_cell_size_meters,
                self.search.max_workers_collect_ids,
            )
            .await?;

        self.collect_offers(
            &ids,
            self.search.offers_batch_size,
            self.search.max_workers_collect_offers,
        )
        .await
    }

    /// Collects unique listing IDs across every cell of the area
    ///
    /// # Arguments
    ///
    /// * `geometry` - Search area in lon/lat degrees
    /// * `cell_size_m` - Maximum cell side in Web Mercator meters
    /// * `concurrency` - Cluster requests in flight at once
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ListingId>)` - Deduplicated IDs in first-seen order
    /// * `Err(CianError)` - A geometry error (raised before any request) or the
    ///   aggregated failures of the cluster requests
    pub async fn collect_ids(
        &self,
        geometry: &Geometry<f64>,
        cell_size_m: f64,
        concurrency: usize,
    ) -> Result<Vec<ListingId>, CianError> {
        let cells = partition(geometry, cell_size_m)?;
        let started = Instant::now();
        tracing::info!(
            "Collecting listing IDs from {} cells with {} workers",
            cells.len(),
            concurrency
        );

        let api = Arc::clone(&self.api);
        let pool = WorkerPool::new(
            move |cell: GeoBounds| {
                let api = Arc::clone(&api);
                async move { api.fetch_clusters(cell).await }
            },
            concurrency,
        )
        .with_name("get clusters")
        .on_progress(log_progress("get clusters"));

        let clusters = pool.map(cells).await?;

        let ids = dedup_ids(
            clusters
                .iter()
                .flatten()
                .flat_map(|cluster| cluster.cluster_offer_ids.iter().copied()),
        );

        tracing::info!(
            "Collected {} unique listing IDs in {:?}",
            ids.len(),
            started.elapsed()
        );
        Ok(ids)
    }

    /// Fetches full listing records for `ids`
    ///
    /// # Arguments
    ///
    /// * `ids` - Listing IDs to fetch
    /// * `batch_size` - IDs per request, at most [`MAX_OFFERS_BATCH_SIZE`]
    /// * `concurrency` - Detail requests in flight at once
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Offer>)` - Records in batch order
    /// * `Err(CianError)` - Invalid batch size or the aggregated request failures
    pub async fn collect_offers(
        &self,
        ids: &[ListingId],
        batch_size: usize,
        concurrency: usize,
    ) -> Result<Vec<Offer>, CianError> {
        if batch_size == 0 || batch_size > MAX_OFFERS_BATCH_SIZE {
            return Err(CianError::InvalidBatchSize {
                size: batch_size,
                max: MAX_OFFERS_BATCH_SIZE,
            });
        }

        if ids.is_empty() {
            tracing::info!("No listing IDs to fetch");
            return Ok(Vec::new());
        }

        let chunks = batches(ids, batch_size);
        let started = Instant::now();
        tracing::info!(
            "Fetching {} listings in {} batches with {} workers",
            ids.len(),
            chunks.len(),
            concurrency
        );

        let api = Arc::clone(&self.api);
        let pool = WorkerPool::new(
            move |batch: Vec<ListingId>| {
                let api = Arc::clone(&api);
                async move { api.fetch_offers(batch).await }
            },
            concurrency,
        )
        .with_name("get offers")
        .on_progress(log_progress("get offers"));

        let offers: Vec<Offer> = pool.map(chunks).await?.into_iter().flatten().collect();

        tracing::info!(
            "Fetched {} listings in {:?}",
            offers.len(),
            started.elapsed()
        );
        Ok(offers)
    }
}

/// Removes repeated IDs, keeping the first occurrence of each
pub fn dedup_ids(ids: impl IntoIterator<Item = ListingId>) -> Vec<ListingId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Splits IDs into consecutive batches of at most `size`
///
/// `size` must be non-zero.
pub fn batches(ids: &[ListingId], size: usize) -> Vec<Vec<ListingId>> {
    ids.chunks(size).map(<[ListingId]>::to_vec).collect()
}

/// Logs phase progress each time the whole percentage changes
fn log_progress(label: &'static str) -> impl Fn(usize, usize) + Send + Sync + 'static {
    let last = AtomicUsize::new(usize::MAX);
    move |current, total| {
        let percent = current * 100 / total.max(1);
        if last.swap(percent, Ordering::Relaxed) != percent {
            tracing::info!("{} progress: {}%", label, percent);
        }
    }
}
