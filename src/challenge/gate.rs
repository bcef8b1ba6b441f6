use crate::challenge::singleflight::SingleFlight;
use crate::challenge::sitekey::extract_site_key;
use crate::challenge::solver::CaptchaSolver;
use crate::challenge::ChallengeError;
use crate::crawler::{truncate_body, Session};
use crate::CianError;
use reqwest::{Request, Response, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Status the service uses to redirect a request to the captcha
pub const CHALLENGE_STATUS: StatusCode = StatusCode::FOUND;

/// Total tries of one request: the original plus one replay after a solve
pub const MAX_ATTEMPTS: usize = 2;

/// Every challenge shares this key, so only one solve runs process-wide
pub const CHALLENGE_KEY: &str = "captcha";

type SolveOutcome = Result<(), Arc<ChallengeError>>;

/// Observable state of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Requests flow normally
    Clear,
    /// A solve is in flight; callers hitting the challenge join it
    Challenged,
}

/// Wraps outbound calls and clears the captcha when the service demands it
pub struct ChallengeGate {
    session: Session,
    solver: Arc<dyn CaptchaSolver>,
    flight: SingleFlight<&'static str, SolveOutcome>,
    /// Number of successful solves so far
    generation: Arc<AtomicU64>,
}

impl ChallengeGate {
    pub fn new(session: Session, solver: Arc<dyn CaptchaSolver>) -> Self {
        Self {
            session,
            solver,
            flight: SingleFlight::new(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> GateState {
        if self.flight.in_flight(&CHALLENGE_KEY) {
            GateState::Challenged
        } else {
            GateState::Clear
        }
    }

    /// Executes a request, solving the captcha and replaying once if challenged
    ///
    /// # Returns
    ///
    /// * `Ok(Response)` - Any response other than the challenge redirect
    /// * `Err(CianError)` - Transport failure, solve failure, or a second
    ///   challenge right after a successful solve
    pub async fn invoke(&self, request: Request) -> Result<Response, CianError> {
        let url = request.url().to_string();

        for attempt in 1..=MAX_ATTEMPTS {
            let replay = request
                .try_clone()
                .ok_or_else(|| CianError::RequestNotReplayable { url: url.clone() })?;

            let generation = self.generation.load(Ordering::Acquire);
            let response = self
                .session
                .client()
                .execute(replay)
                .await
                .map_err(|source| CianError::Http {
                    url: url.clone(),
                    source,
                })?;

            if response.status() != CHALLENGE_STATUS {
                return Ok(response);
            }

            tracing::warn!(
                "Captcha challenge on {} (attempt {}/{})",
                url,
                attempt,
                MAX_ATTEMPTS
            );

            if attempt == MAX_ATTEMPTS {
                break;
            }

            // Redirect issued before a solve that has since finished
            if self.generation.load(Ordering::Acquire) != generation {
                tracing::debug!("Skipping stale challenge on {}", url);
                continue;
            }

            self.solve().await?;
        }

        Err(CianError::ChallengeNotResolved {
            url,
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Solves the captcha, joining a solve already in flight if there is one
    pub async fn solve(&self) -> Result<(), CianError> {
        let session = self.session.clone();
        let solver = Arc::clone(&self.solver);
        let generation = Arc::clone(&self.generation);

        self.flight
            .run(CHALLENGE_KEY, move || async move {
                tracing::info!("Solving captcha...");
                let outcome = solve_challenge(&session, solver.as_ref()).await;
                match &outcome {
                    Ok(()) => {
                        generation.fetch_add(1, Ordering::AcqRel);
                        tracing::info!("Captcha solved");
                    }
                    Err(e) => tracing::error!("Captcha solve failed: {}", e),
                }
                outcome.map_err(Arc::new)
            })
            .await
            .map_err(CianError::Challenge)
    }
}

/// Runs the page → solver → verify sequence once
async fn solve_challenge(
    session: &Session,
    solver: &dyn CaptchaSolver,
) -> Result<(), ChallengeError> {
    let captcha_url = session.endpoints().captcha.clone();

    let response = session
        .client()
        .get(captcha_url.clone())
        .send()
        .await
        .map_err(ChallengeError::PageRequest)?;
    let status = response.status();
    let body = response.text().await.map_err(ChallengeError::PageRequest)?;

    if status != StatusCode::OK {
        return Err(ChallengeError::PageStatus {
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    let site_key = extract_site_key(&body)
        .ok_or(ChallengeError::SiteKeyNotFound)?
        .to_string();
    tracing::debug!("Captcha site-key: {}", site_key);

    let token = solver
        .solve_recaptcha(&site_key, captcha_url.as_str())
        .await?;

    let response = session
        .client()
        .post(captcha_url)
        .form(&[("g-recaptcha-response", token.as_str()), ("redirect_url", "")])
        .send()
        .await
        .map_err(ChallengeError::VerifyRequest)?;
    let status = response.status();

    if status != CHALLENGE_STATUS {
        let body = response.text().await.unwrap_or_default();
        return Err(ChallengeError::VerifyStatus {
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    Ok(())
}
