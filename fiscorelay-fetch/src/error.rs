//! Fetch error types.

use thiserror::Error;

use crate::probe::ProbeAttempt;

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header value could not be encoded.
    #[error("Invalid header value for {0}")]
    InvalidHeader(String),

    /// Client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl HttpError {
    /// Returns true for connect failures and timeouts, which a retry may fix.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

// ============================================================================
// Probe Error
// ============================================================================

/// Error type for landing probes.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No candidate paths were configured.
    #[error("No landing candidates configured")]
    NoCandidates,

    /// Every candidate failed.
    #[error("Landing probe failed after {} attempts", .attempts.len())]
    AllCandidatesFailed {
        /// Every attempt made, in order.
        attempts: Vec<ProbeAttempt>,
    },
}
