//! Ordered probing of candidate landing pages.
//!
//! Cookie/CSRF-protected APIs hand out their bootstrap cookies on some
//! unauthenticated page, but which page varies between deployments. The
//! probe tries each candidate path in order and stops at the first one that
//! answers with a status below 400. Transient transport failures on a
//! candidate are retried according to the configured [`RetryStrategy`];
//! anything else moves on to the next candidate.

use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::cookies::set_cookie_headers;
use crate::error::{HttpError, ProbeError};
use crate::http::HttpClient;
use crate::retry::RetryStrategy;

// ============================================================================
// Probe Attempt
// ============================================================================

/// Record of a single request made by the probe.
#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    /// Candidate path.
    pub path: String,
    /// 1-based attempt number for this path.
    pub attempt: u32,
    /// Response status, if a response arrived.
    pub status: Option<u16>,
    /// Error if the attempt failed.
    pub error: Option<String>,
    /// How long the attempt took.
    pub duration: Duration,
}

impl ProbeAttempt {
    /// Returns true if this attempt reached a usable page.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// Landing Hit
// ============================================================================

/// The first candidate that answered.
#[derive(Debug, Clone)]
pub struct LandingHit {
    /// The path that answered.
    pub path: String,
    /// Its status code.
    pub status: u16,
    /// Raw `Set-Cookie` values from the response, in order.
    pub set_cookies: Vec<String>,
    /// All attempts made, including the successful one.
    pub attempts: Vec<ProbeAttempt>,
}

impl LandingHit {
    /// Returns the failed attempts that preceded the hit.
    pub fn failures(&self) -> impl Iterator<Item = &ProbeAttempt> {
        self.attempts.iter().filter(|a| !a.is_success())
    }
}

// ============================================================================
// Landing Probe
// ============================================================================

/// Tries candidate landing paths in order.
#[derive(Debug, Clone)]
pub struct LandingProbe {
    candidates: Vec<String>,
    retry: RetryStrategy,
    headers: HeaderMap,
}

impl LandingProbe {
    /// Creates a probe over the given candidate paths, tried in order.
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            retry: RetryStrategy::no_retry(),
            headers: HeaderMap::new(),
        }
    }

    /// Sets the retry strategy applied to each candidate.
    pub fn with_retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the headers sent with every probe request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Returns the candidate paths.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Runs the probe.
    #[instrument(skip(self, client), fields(candidates = self.candidates.len()))]
    pub async fn run(&self, client: &HttpClient) -> Result<LandingHit, ProbeError> {
        if self.candidates.is_empty() {
            return Err(ProbeError::NoCandidates);
        }

        let mut attempts = Vec::new();

        for path in &self.candidates {
            let mut attempt = 0;
            loop {
                attempt += 1;
                let started = Instant::now();
                debug!(path = %path, attempt, "Probing landing candidate");

                match client.get_with_headers(path, self.headers.clone()).await {
                    Ok(response) if response.status().as_u16() < 400 => {
                        let status = response.status().as_u16();
                        let set_cookies = set_cookie_headers(response.headers());
                        attempts.push(ProbeAttempt {
                            path: path.clone(),
                            attempt,
                            status: Some(status),
                            error: None,
                            duration: started.elapsed(),
                        });
                        info!(path = %path, status, cookies = set_cookies.len(), "Landing candidate reached");
                        return Ok(LandingHit {
                            path: path.clone(),
                            status,
                            set_cookies,
                            attempts,
                        });
                    }
                    Ok(response) => {
                        let status = response.status().as_u16();
                        warn!(path = %path, status, "Landing candidate rejected");
                        attempts.push(ProbeAttempt {
                            path: path.clone(),
                            attempt,
                            status: Some(status),
                            error: Some(format!("HTTP {status}")),
                            duration: started.elapsed(),
                        });
                        break;
                    }
                    Err(error) => {
                        warn!(path = %path, attempt, error = %error, "Landing candidate unreachable");
                        let retry = self.retry.should_retry(attempt, &error);
                        attempts.push(failed_attempt(path, attempt, &error, started));
                        if !retry {
                            break;
                        }
                        let delay = self.retry.jittered_delay_for_attempt(attempt);
                        debug!(path = %path, delay = ?delay, "Retrying landing candidate");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!(attempts = attempts.len(), "All landing candidates failed");
        Err(ProbeError::AllCandidatesFailed { attempts })
    }
}

fn failed_attempt(path: &str, attempt: u32, error: &HttpError, started: Instant) -> ProbeAttempt {
    ProbeAttempt {
        path: path.to_string(),
        attempt,
        status: None,
        error: Some(error.to_string()),
        duration: started.elapsed(),
    }
}

// ============================================================================
// Tests
// ============================================================================
