//! Anti-bot challenge handling
//!
//! The listing service answers any API call with a `302 Found` redirect to its
//! captcha page once it decides the client looks automated. This module:
//! - Detects that redirect on every outbound call ([`ChallengeGate::invoke`])
//! - Solves the captcha at most once at a time across all callers
//! - Replays the original request after a successful solve

mod gate;
mod singleflight;
mod sitekey;
mod solver;

pub use gate::{ChallengeGate, GateState, CHALLENGE_KEY, CHALLENGE_STATUS, MAX_ATTEMPTS};
pub use singleflight::SingleFlight;
pub use sitekey::extract_site_key;
pub use solver::{CaptchaSolver, RuCaptchaSolver, SolverError};

use thiserror::Error;

/// Errors raised while solving the captcha
#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("Can't fetch captcha page: {0}")]
    PageRequest(#[source] reqwest::Error),

    #[error("Captcha page returned status {status}: {body}")]
    PageStatus { status: u16, body: String },

    #[error("Captcha site-key not found")]
    SiteKeyNotFound,

    #[error("Can't get captcha solution: {0}")]
    Solver(#[from] SolverError),

    #[error("Can't send captcha code: {0}")]
    VerifyRequest(#[source] reqwest::Error),

    #[error("Server sent unexpected code: {status} (expected 302), {body}")]
    VerifyStatus { status: u16, body: String },
}
