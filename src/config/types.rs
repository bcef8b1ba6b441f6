use crate::api::FilterTerm;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Hard cap on listing IDs per detail request enforced by the API
pub const MAX_OFFERS_BATCH_SIZE: usize = 28;

pub const DEFAULT_BASE_URL: &str = "https://api.cian.ru";
pub const DEFAULT_CAPTCHA_SERVICE_URL: &str = "https://rucaptcha.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

/// Main configuration structure for cianparser
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub captcha: CaptchaConfig,
    pub output: OutputConfig,
}

/// What to search for and how hard to hit the API while doing it
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search type discriminator sent as `_type` (e.g. "flatsale")
    #[serde(rename = "search-type")]
    pub search_type: String,

    /// Filter terms passed through to the API's jsonQuery
    #[serde(default)]
    pub query: BTreeMap<String, FilterTerm>,

    /// Maximum side of a map cell, in Web Mercator meters
    #[serde(rename = "max-cell-size-meters")]
    pub max_cell_size_meters: f64,

    /// Concurrent cluster requests during ID collection
    #[serde(rename = "max-workers-collect-ids")]
    pub max_workers_collect_ids: usize,

    /// Concurrent detail requests during offer collection
    #[serde(rename = "max-workers-collect-offers")]
    pub max_workers_collect_offers: usize,

    /// Listing IDs per detail request
    #[serde(rename = "offers-batch-size", default = "default_batch_size")]
    pub offers_batch_size: usize,
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the listing API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Extra headers set on every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout(),
            headers: BTreeMap::new(),
        }
    }
}

/// External captcha solving service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    #[serde(rename = "api-key")]
    pub api_key: String,

    #[serde(rename = "service-url", default = "default_captcha_service_url")]
    pub service_url: String,

    /// Wait before the first result poll
    #[serde(rename = "initial-delay-secs", default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    #[serde(rename = "poll-interval-secs", default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up on a single solve after this many seconds
    #[serde(rename = "timeout-secs", default = "default_captcha_timeout")]
    pub timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON file receiving collected offers
    #[serde(rename = "offers-path")]
    pub offers_path: String,
}

fn default_batch_size() -> usize {
    MAX_OFFERS_BATCH_SIZE
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_captcha_service_url() -> String {
    DEFAULT_CAPTCHA_SERVICE_URL.to_string()
}

fn default_initial_delay() -> u64 {
    15
}

fn default_poll_interval() -> u64 {
    5
}

fn default_captcha_timeout() -> u64 {
    180
}
