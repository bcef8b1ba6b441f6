//! HTTP session and API calls
//!
//! This module handles:
//! - Building the shared HTTP client (cookie store, no redirects, default headers)
//! - Resolving the API endpoints against the configured base URL
//! - Sending cluster and detail queries through the challenge gate
//! - Classifying responses into decoded bodies or errors

use crate::api::{
    GetClustersRequest, GetClustersResponse, GetOffersByIdsRequest, GetOffersByIdsResponse,
    JsonQuery, ListingId, Offer, Cluster, CLUSTERS_ZOOM,
};
use crate::challenge::ChallengeGate;
use crate::config::HttpConfig;
use crate::geo::GeoBounds;
use crate::{CianError, ConfigError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const CLUSTERS_PATH: &str = "search-offers-index-map/v1/get-clusters-for-map/";
pub const OFFERS_PATH: &str = "search-offers/v1/get-offers-by-ids-desktop/";
pub const CAPTCHA_PATH: &str = "captcha/";

/// Longest response body excerpt kept in error messages
const MAX_BODY_IN_ERROR: usize = 512;

/// Endpoint URLs resolved against the API base
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub clusters: Url,
    pub offers: Url,
    pub captcha: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("base_url: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |path: &str| {
            base.join(path)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", path, e)))
        };

        Ok(Self {
            clusters: join(CLUSTERS_PATH)?,
            offers: join(OFFERS_PATH)?,
            captcha: join(CAPTCHA_PATH)?,
        })
    }
}

/// HTTP state shared by every worker of a crawl
///
/// Cloning is cheap and every clone talks through the same connection pool
/// and cookie store, so cookies set by a captcha solve are visible to all
/// subsequent requests.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    endpoints: Arc<Endpoints>,
}

impl Session {
    /// Builds a session from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, CianError> {
        let client = build_http_client(config)?;
        Self::with_client(client, &config.base_url)
    }

    /// Builds a session around an existing client
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, CianError> {
        Ok(Self {
            client,
            endpoints: Arc::new(Endpoints::new(base_url)?),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

/// Builds the HTTP client used for every API call
///
/// Redirects are never followed: the captcha redirect must reach the
/// challenge gate as a `302` instead of being chased to the captcha page.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, CianError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}' value: {}", name, e)))?;
        headers.insert(name, value);
    }

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Shortens a response body for inclusion in an error
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_IN_ERROR) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Reads a `200 OK` JSON response, turning anything else into an error
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CianError> {
    let url = response.url().to_string();
    let status = response.status();
    let body = response.text().await.map_err(|source| CianError::Http {
        url: url.clone(),
        source,
    })?;

    if status != StatusCode::OK {
        return Err(CianError::UnexpectedStatus {
            url,
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|source| CianError::Decode {
        url,
        source,
        body: truncate_body(&body),
    })
}

/// Listing API client: every call goes through the challenge gate
pub struct CianApi {
    gate: ChallengeGate,
    query: JsonQuery,
}

impl CianApi {
    pub fn new(gate: ChallengeGate, query: JsonQuery) -> Self {
        Self { gate, query }
    }

    pub fn gate(&self) -> &ChallengeGate {
        &self.gate
    }

    pub fn query(&self) -> &JsonQuery {
        &self.query
    }

    /// Fetches the listing clusters inside one cell
    pub async fn fetch_clusters(&self, cell: GeoBounds) -> Result<Vec<Cluster>, CianError> {
        let body = GetClustersRequest {
            zoom: CLUSTERS_ZOOM,
            bbox: vec![cell.into()],
            json_query: self.query.clone(),
        };
        let url = self.gate.session().endpoints().clusters.clone();

        let response: GetClustersResponse = self.post_json(url, &body).await?;
        tracing::trace!(
            "Cell {:?}: {} clusters, {} offers",
            cell,
            response.filtered.len(),
            response.offers_count
        );
        Ok(response.filtered)
    }

    /// Fetches full records for a batch of listing IDs
    pub async fn fetch_offers(&self, ids: Vec<ListingId>) -> Result<Vec<Offer>, CianError> {
        let body = GetOffersByIdsRequest {
            cian_offer_ids: ids,
            json_query: self.query.clone(),
        };
        let url = self.gate.session().endpoints().offers.clone();

        let response: GetOffersByIdsResponse = self.post_json(url, &body).await?;
        Ok(response.offers_serialized)
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, CianError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let request = self
            .gate
            .session()
            .client()
            .post(url)
            .json(body)
            .build()?;

        let response = self.gate.invoke(request).await?;
        read_json(response).await
    }
}
