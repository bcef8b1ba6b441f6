//! External captcha solving service
//!
//! The solver is a trait so the gate can be driven by a fake in tests. The
//! production implementation talks to the rucaptcha/2captcha HTTP API: a task
//! is submitted to `in.php`, then `res.php` is polled until a token is ready.

use crate::config::CaptchaConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Errors returned by a captcha solving service
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Solver rejected the task: {0}")]
    Rejected(String),

    #[error("Solver gave no answer within {0:?}")]
    Timeout(Duration),

    #[error("Invalid solver URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Solves a reCAPTCHA v2 for a page
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Returns the `g-recaptcha-response` token for `site_key` on `page_url`
    async fn solve_recaptcha(&self, site_key: &str, page_url: &str) -> Result<String, SolverError>;
}

/// Status answer shared by `in.php` and `res.php` when `json=1` is set
#[derive(Debug, Deserialize)]
struct ServiceResponse {
    status: u8,
    request: String,
}

const NOT_READY: &str = "CAPCHA_NOT_READY";

/// rucaptcha.com / 2captcha.com client
pub struct RuCaptchaSolver {
    client: Client,
    api_key: String,
    submit_url: url::Url,
    result_url: url::Url,
    initial_delay: Duration,
    poll_interval: Duration,
    timeout: Duration,
}

impl RuCaptchaSolver {
    /// Creates a solver from the captcha section of the configuration
    pub fn new(config: &CaptchaConfig) -> Result<Self, SolverError> {
        let base = url::Url::parse(&config.service_url)?;
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            api_key: config.api_key.clone(),
            submit_url: base.join("in.php")?,
            result_url: base.join("res.php")?,
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Overrides the polling cadence
    pub fn with_timing(mut self, initial_delay: Duration, poll_interval: Duration, timeout: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    async fn submit(&self, site_key: &str, page_url: &str) -> Result<String, SolverError> {
        let response: ServiceResponse = self
            .client
            .post(self.submit_url.clone())
            .form(&[
                ("key", self.api_key.as_str()),
                ("method", "userrecaptcha"),
                ("googlekey", site_key),
                ("pageurl", page_url),
                ("json", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != 1 {
            return Err(SolverError::Rejected(response.request));
        }
        Ok(response.request)
    }

    async fn poll(&self, task_id: &str) -> Result<Option<String>, SolverError> {
        let response: ServiceResponse = self
            .client
            .get(self.result_url.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("action", "get"),
                ("id", task_id),
                ("json", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.status {
            1 => Ok(Some(response.request)),
            _ if response.request == NOT_READY => Ok(None),
            _ => Err(SolverError::Rejected(response.request)),
        }
    }
}

#[async_trait]
impl CaptchaSolver for RuCaptchaSolver {
    async fn solve_recaptcha(&self, site_key: &str, page_url: &str) -> Result<String, SolverError> {
        let deadline = Instant::now() + self.timeout;

        let task_id = self.submit(site_key, page_url).await?;
        tracing::debug!("Captcha task {} submitted", task_id);

        tokio::time::sleep(self.initial_delay).await;
        loop {
            if let Some(token) = self.poll(&task_id).await? {
                tracing::debug!("Captcha task {} answered", task_id);
                return Ok(token);
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(SolverError::Timeout(self.timeout));
            }
            tracing::debug!("Captcha task {} not ready, polling again", task_id);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
