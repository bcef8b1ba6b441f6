//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use cianparser::challenge::{CaptchaSolver, SolverError};
use cianparser::config::{HttpConfig, SearchConfig};
use cianparser::crawler::Session;
use geo::{Geometry, Rect};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SITE_KEY: &str = "6Lc-test-site-key";
pub const TOKEN: &str = "solved-token";

/// Session talking to the mock server
pub fn session_for(server: &MockServer) -> Session {
    let http = HttpConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..HttpConfig::default()
    };
    Session::new(&http).expect("Failed to build session")
}

pub fn search_config() -> SearchConfig {
    SearchConfig {
        search_type: "flatsale".to_string(),
        query: BTreeMap::new(),
        max_cell_size_meters: 6000.0,
        max_workers_collect_ids: 1,
        max_workers_collect_offers: 1,
        offers_batch_size: 28,
    }
}

/// Axis-aligned rectangle in lon/lat degrees
pub fn rectangle(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Geometry<f64> {
    Geometry::Polygon(
        Rect::new(
            geo::coord! { x: min_lng, y: min_lat },
            geo::coord! { x: max_lng, y: max_lat },
        )
        .to_polygon(),
    )
}

/// Captcha page body carrying a site-key the way the service embeds it
pub fn captcha_page(site_key: &str) -> String {
    format!(
        r#"<html><body><script>
        grecaptcha.render('captcha', {{'sitekey': '{}', 'callback': onSolved}});
        </script></body></html>"#,
        site_key
    )
}

/// Solver fake that counts calls and answers after a delay
pub struct CountingSolver {
    calls: AtomicUsize,
    delay: Duration,
    reject: Option<String>,
}

impl CountingSolver {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            reject: None,
        })
    }

    pub fn rejecting(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            reject: Some(reason.to_string()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaSolver for CountingSolver {
    async fn solve_recaptcha(&self, site_key: &str, page_url: &str) -> Result<String, SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(site_key, SITE_KEY);
        assert!(page_url.ends_with("/captcha/"));

        tokio::time::sleep(self.delay).await;
        match &self.reject {
            Some(reason) => Err(SolverError::Rejected(reason.clone())),
            None => Ok(TOKEN.to_string()),
        }
    }
}

/// API endpoint that redirects to the captcha until it has been solved
pub struct ChallengedEndpoint {
    pub solved: Arc<AtomicBool>,
    pub body: serde_json::Value,
}

impl Respond for ChallengedEndpoint {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        if self.solved.load(Ordering::SeqCst) {
            ResponseTemplate::new(200).set_body_json(self.body.clone())
        } else {
            ResponseTemplate::new(302).insert_header("location", "/captcha/")
        }
    }
}

/// Captcha verification endpoint that marks the challenge solved
pub struct VerifyEndpoint {
    pub solved: Arc<AtomicBool>,
    pub status: u16,
}

impl Respond for VerifyEndpoint {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        if self.status == 302 {
            self.solved.store(true, Ordering::SeqCst);
            ResponseTemplate::new(302).insert_header("location", "/")
        } else {
            ResponseTemplate::new(self.status).set_body_string("captcha rejected")
        }
    }
}

/// Mounts the captcha page and its verification endpoint
pub async fn mount_captcha(
    server: &MockServer,
    solved: &Arc<AtomicBool>,
    page: String,
    verify_status: u16,
) {
    Mock::given(method("GET"))
        .and(path("/captcha/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/captcha/"))
        .respond_with(VerifyEndpoint {
            solved: Arc::clone(solved),
            status: verify_status,
        })
        .mount(server)
        .await;
}

/// Clusters response carrying one cluster per ID list
pub fn clusters_body(clusters: &[&[i64]]) -> serde_json::Value {
    let filtered: Vec<serde_json::Value> = clusters
        .iter()
        .map(|ids| {
            serde_json::json!({
                "count": ids.len(),
                "clusterOfferIds": ids,
            })
        })
        .collect();

    serde_json::json!({
        "filtered": filtered,
        "offersCount": clusters.iter().map(|ids| ids.len()).sum::<usize>(),
    })
}
