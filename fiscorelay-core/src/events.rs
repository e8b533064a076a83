//! Workflow observation.
//!
//! Every state-machine transition of the provider workflow (login attempted,
//! succeeded or failed; customer resolved or created; invoice submitted or
//! rejected) is described by a [`WorkflowEvent`] and handed to an
//! [`EventSink`]. Sinks are fire-and-forget: they never fail the operation
//! that emitted the event.
//!
//! Payloads are redacted at construction time. Passwords never appear in an
//! event, e-mails are masked and tokens are truncated.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

// ============================================================================
// Redaction
// ============================================================================

/// Masks an e-mail address down to its first three characters.
pub fn mask_email(email: &str) -> String {
    let prefix: String = email.chars().take(3).collect();
    format!("{prefix}***")
}

/// Truncates a secret to a short prefix.
///
/// At most ten characters and never more than half of the value are kept.
pub fn truncate_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let keep = (secret.chars().count() / 2).min(10);
    let prefix: String = secret.chars().take(keep).collect();
    format!("{prefix}...")
}

// ============================================================================
// Event Level
// ============================================================================

/// Severity of a workflow event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Normal progress.
    Info,
    /// Degraded but continuing.
    Warn,
    /// The operation failed.
    Error,
}

impl EventLevel {
    /// Returns the level as stored in the session log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Supporting Enums
// ============================================================================

/// How a provider session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// CSRF bootstrap followed by a cookie-session login.
    CsrfSession,
    /// Direct login without CSRF that returned a token.
    DirectToken,
}

impl LoginMethod {
    /// Returns a short label for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsrfSession => "csrf_session",
            Self::DirectToken => "direct_token",
        }
    }
}

/// How a customer resolution reached its final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// The record already carried a provider id.
    Existing,
    /// First match of a provider search.
    Search,
    /// Created on the provider.
    Created,
}

impl ResolutionSource {
    /// Returns a short label for this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::Search => "search",
            Self::Created => "created",
        }
    }
}

// ============================================================================
// Workflow Event
// ============================================================================

/// A transition of the provider workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A login handshake started.
    LoginAttempted {
        /// Masked e-mail.
        email: String,
    },
    /// A landing candidate could not be used for the CSRF bootstrap.
    LandingCandidateFailed {
        /// Candidate path.
        path: String,
        /// Why it was skipped.
        reason: String,
    },
    /// The login handshake produced a session.
    LoginSucceeded {
        /// Masked e-mail.
        email: String,
        /// How the session was obtained.
        method: LoginMethod,
    },
    /// The login handshake failed.
    LoginFailed {
        /// Masked e-mail.
        email: String,
        /// Failure description.
        reason: String,
    },
    /// The stored session was dropped.
    SessionCleared {
        /// Why it was dropped.
        reason: String,
    },
    /// A customer search completed.
    CustomerSearched {
        /// Searched name.
        query: String,
        /// Number of matches.
        results: usize,
    },
    /// A client was linked to a provider customer id.
    CustomerResolved {
        /// Provider customer id.
        customer_id: String,
        /// Client legal name.
        legal_name: String,
        /// How the id was obtained.
        source: ResolutionSource,
    },
    /// The provider refused to create a customer.
    CustomerCreationFailed {
        /// Client legal name.
        legal_name: String,
        /// Provider status code, when there was a response.
        status: Option<u16>,
        /// Provider error message.
        error: String,
    },
    /// The customer-detail pre-fetch failed; submission continues.
    CustomerDetailUnavailable {
        /// Provider customer id.
        customer_id: String,
        /// Failure description.
        reason: String,
    },
    /// An invoice was created.
    InvoiceSubmitted {
        /// Provider invoice id.
        invoice_id: String,
        /// Invoice number, when returned.
        invoice_number: Option<String>,
        /// Client legal name.
        client_name: String,
        /// Number of rows submitted.
        line_items: usize,
    },
    /// The provider refused an invoice.
    InvoiceRejected {
        /// Client legal name.
        client_name: String,
        /// Provider status code, when there was a response.
        status: Option<u16>,
        /// Provider error message.
        error: String,
    },
    /// A pass-through lookup completed.
    LookupCompleted {
        /// Lookup kind (`vat`, `location`).
        kind: String,
        /// Looked-up key.
        key: String,
        /// Whether the lookup produced a usable answer.
        ok: bool,
    },
}

impl WorkflowEvent {
    /// Returns the severity of this event.
    pub fn level(&self) -> EventLevel {
        match self {
            Self::LoginAttempted { .. }
            | Self::LoginSucceeded { .. }
            | Self::CustomerSearched { .. }
            | Self::CustomerResolved { .. }
            | Self::InvoiceSubmitted { .. } => EventLevel::Info,
            Self::LookupCompleted { ok, .. } => {
                if *ok {
                    EventLevel::Info
                } else {
                    EventLevel::Warn
                }
            }
            Self::LandingCandidateFailed { .. }
            | Self::SessionCleared { .. }
            | Self::CustomerDetailUnavailable { .. } => EventLevel::Warn,
            Self::LoginFailed { .. }
            | Self::CustomerCreationFailed { .. }
            | Self::InvoiceRejected { .. } => EventLevel::Error,
        }
    }

    /// Returns the log message for this event.
    pub fn message(&self) -> &'static str {
        match self {
            Self::LoginAttempted { .. } => "Provider login attempted",
            Self::LandingCandidateFailed { .. } => "Landing candidate unavailable",
            Self::LoginSucceeded { .. } => "Provider login successful",
            Self::LoginFailed { .. } => "Provider login failed",
            Self::SessionCleared { .. } => "Provider session cleared",
            Self::CustomerSearched { .. } => "Customer search completed",
            Self::CustomerResolved { .. } => "Customer resolved",
            Self::CustomerCreationFailed { .. } => "Customer creation failed",
            Self::CustomerDetailUnavailable { .. } => "Customer detail unavailable",
            Self::InvoiceSubmitted { .. } => "Invoice created",
            Self::InvoiceRejected { .. } => "Invoice rejected",
            Self::LookupCompleted { .. } => "Lookup completed",
        }
    }

    /// Returns the structured payload for this event.
    pub fn payload(&self) -> Value {
        match self {
            Self::LoginAttempted { email } => json!({ "email": email }),
            Self::LandingCandidateFailed { path, reason } => {
                json!({ "path": path, "reason": reason })
            }
            Self::LoginSucceeded { email, method } => {
                json!({ "email": email, "method": method.as_str() })
            }
            Self::LoginFailed { email, reason } => json!({ "email": email, "error": reason }),
            Self::SessionCleared { reason } => json!({ "reason": reason }),
            Self::CustomerSearched { query, results } => {
                json!({ "companyName": query, "resultsCount": results })
            }
            Self::CustomerResolved {
                customer_id,
                legal_name,
                source,
            } => json!({
                "clientId": customer_id,
                "ragioneSociale": legal_name,
                "source": source.as_str(),
            }),
            Self::CustomerCreationFailed {
                legal_name,
                status,
                error,
            } => json!({ "ragioneSociale": legal_name, "status": status, "error": error }),
            Self::CustomerDetailUnavailable {
                customer_id,
                reason,
            } => json!({ "clientId": customer_id, "error": reason }),
            Self::InvoiceSubmitted {
                invoice_id,
                invoice_number,
                client_name,
                line_items,
            } => json!({
                "invoiceId": invoice_id,
                "invoiceNumber": invoice_number,
                "clientName": client_name,
                "lineItems": line_items,
            }),
            Self::InvoiceRejected {
                client_name,
                status,
                error,
            } => json!({ "clientName": client_name, "status": status, "error": error }),
            Self::LookupCompleted { kind, key, ok } => {
                json!({ "kind": kind, "key": key, "ok": ok })
            }
        }
    }
}

// ============================================================================
// Event Sink
// ============================================================================

/// Receiver of workflow events.
///
/// Implementations must not panic and must swallow their own failures.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn observe(&self, event: &WorkflowEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn observe(&self, _event: &WorkflowEvent) {}
}

// ============================================================================
// Tests
// ============================================================================
