//! Fiscozen-specific error types.

use std::time::Duration;

use fiscorelay_core::CoreError;
use fiscorelay_fetch::HttpError;
use thiserror::Error;

/// Errors specific to Fiscozen operations.
#[derive(Debug, Error)]
pub enum FiscozenError {
    /// E-mail or password missing.
    #[error("Email and password required")]
    InvalidCredentials,

    /// No landing page and no login endpoint could be reached.
    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// No CSRF cookie was issued and the direct login failed.
    #[error("CSRF token not found and direct login failed")]
    CsrfUnavailable,

    /// The provider refused the credentials.
    #[error("Authentication rejected ({status}): {message}")]
    AuthenticationRejected {
        /// Login response status.
        status: u16,
        /// Provider message, or a generic one.
        message: String,
    },

    /// No valid session is stored.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The provider answered 401; the stored session has been cleared.
    #[error("Session expired, login required")]
    SessionExpired,

    /// The provider refused to create a customer.
    #[error("Client creation failed ({status}): {body}")]
    ClientCreationFailed {
        /// Response status.
        status: u16,
        /// Provider error body, verbatim.
        body: String,
    },

    /// The provider refused an invoice.
    #[error("Invoice rejected ({status}): {body}")]
    InvoiceRejected {
        /// Response status.
        status: u16,
        /// Provider error body, verbatim.
        body: String,
    },

    /// The draft has no line items.
    #[error("Invoice has no line items")]
    MissingLineItems,

    /// The draft's client has no legal name.
    #[error("Client legal name is required")]
    MissingClient,

    /// A response matched none of the known envelopes.
    #[error("Unrecognized response shape: {0}")]
    UnrecognizedResponseShape(String),

    /// The client has no provider id and none was found.
    #[error("Client not found: {0}. Please create client first.")]
    CustomerNotResolved(String),

    /// Any other provider rejection.
    #[error("API request failed ({status}): {body}")]
    ApiError {
        /// Response status.
        status: u16,
        /// Provider error body, verbatim.
        body: String,
    },

    /// A pass-through lookup failed.
    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    /// Caller input rejected before any network call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Text extraction failed.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A workflow step exceeded its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl FiscozenError {
    /// Returns true if the caller must log in again before retrying.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::SessionExpired)
    }

    /// Returns true for errors caused by caller input rather than the provider.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::MissingLineItems
                | Self::MissingClient
                | Self::InvalidInput(_)
                | Self::CustomerNotResolved(_)
        )
    }

    /// Returns the provider status code carried by this error, if any.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationRejected { status, .. }
            | Self::ClientCreationFailed { status, .. }
            | Self::InvoiceRejected { status, .. }
            | Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the verbatim provider body for provider rejections.
    pub fn provider_body(&self) -> Option<&str> {
        match self {
            Self::ClientCreationFailed { body, .. }
            | Self::InvoiceRejected { body, .. }
            | Self::ApiError { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns the most useful message for an operator.
    ///
    /// Provider rejections forward the provider's own message when the body
    /// carries one.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.provider_body().and_then(super::parser::provider_message) {
            return message;
        }
        if let Self::AuthenticationRejected { message, .. } = self {
            return message.clone();
        }
        self.to_string()
    }
}

impl From<CoreError> for FiscozenError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MissingLineItems => Self::MissingLineItems,
            CoreError::MissingClient => Self::MissingClient,
            CoreError::Extraction(msg) => Self::Extraction(msg),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<HttpError> for FiscozenError {
    fn from(e: HttpError) -> Self {
        Self::HttpError(e.to_string())
    }
}

impl From<reqwest::Error> for FiscozenError {
    fn from(e: reqwest::Error) -> Self {
        Self::HttpError(e.to_string())
    }
}

impl From<serde_json::Error> for FiscozenError {
    fn from(e: serde_json::Error) -> Self {
        Self::UnrecognizedResponseShape(e.to_string())
    }
}
