//! Authenticated request wrapper.
//!
//! Every call to the provider's private API goes through
//! [`AuthenticatedClient`], which:
//!
//! - refuses to send anything without a valid stored session
//! - attaches the session cookies, the CSRF header and the headers the
//!   provider's bot detection expects from its own web app
//! - clears the session when the provider answers 401

use std::sync::Arc;

use fiscorelay_core::{truncate_secret, EventSink, ProviderSession, WorkflowEvent};
use fiscorelay_fetch::{HttpClient, ResponseExt};
use reqwest::header::HeaderMap;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::error::FiscozenError;
use super::parser::provider_message;
use super::settings::FiscozenSettings;
use super::store::CredentialStore;

// ============================================================================
// Provider Response
// ============================================================================

/// A non-401 provider response, fully read.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// HTTP status.
    pub status: u16,
    /// Raw body.
    pub body: String,
}

impl ProviderResponse {
    async fn read(response: Response) -> Result<Self, FiscozenError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Self { status, body })
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FiscozenError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Returns the provider's message, or the raw body.
    pub fn message(&self) -> String {
        provider_message(&self.body).unwrap_or_else(|| self.body.clone())
    }
}

// ============================================================================
// Authenticated Client
// ============================================================================

/// Sends requests on behalf of the session held in a [`CredentialStore`].
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: HttpClient,
    settings: Arc<FiscozenSettings>,
    store: Arc<CredentialStore>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.settings.base_url)
            .field("authenticated", &self.store.is_valid())
            .finish_non_exhaustive()
    }
}

impl AuthenticatedClient {
    /// Creates a wrapper over `store`.
    pub fn new(
        http: HttpClient,
        settings: Arc<FiscozenSettings>,
        store: Arc<CredentialStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            http,
            settings,
            store,
            sink,
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &FiscozenSettings {
        &self.settings
    }

    /// Returns the event sink.
    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Returns the credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Returns the valid stored session, or `NotAuthenticated`.
    pub fn session(&self) -> Result<ProviderSession, FiscozenError> {
        self.store.current().ok_or(FiscozenError::NotAuthenticated)
    }

    /// Builds the full header set for a request under `session`.
    pub fn headers(
        &self,
        session: &ProviderSession,
        page: Option<&str>,
    ) -> Result<HeaderMap, FiscozenError> {
        let csrf = session.has_csrf().then_some(session.csrf_token.as_str());
        self.settings.xhr_headers(page, &session.cookie_header, csrf)
    }

    /// Sends an authenticated GET with a query string.
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        page: Option<&str>,
    ) -> Result<ProviderResponse, FiscozenError> {
        let session = self.session()?;
        let headers = self.headers(&session, page)?;
        debug!(csrf = %truncate_secret(&session.csrf_token), "Authenticated GET");

        let response = self.http.get_query_with_headers(path, query, headers).await?;
        self.finish(path, &session, response).await
    }

    /// Sends an authenticated JSON POST.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        page: Option<&str>,
    ) -> Result<ProviderResponse, FiscozenError> {
        let session = self.session()?;
        let headers = self.headers(&session, page)?;
        debug!(csrf = %truncate_secret(&session.csrf_token), "Authenticated POST");

        let response = self.http.post_json_with_headers(path, body, headers).await?;
        self.finish(path, &session, response).await
    }

    async fn finish(
        &self,
        path: &str,
        sent_with: &ProviderSession,
        response: Response,
    ) -> Result<ProviderResponse, FiscozenError> {
        if response.is_unauthorized() {
            if self.store.clear_if(&sent_with.marker) {
                warn!(path = %path, "Provider answered 401, clearing session");
                self.sink.observe(&WorkflowEvent::SessionCleared {
                    reason: format!("401 from {path}"),
                });
            } else {
                warn!(path = %path, "Provider answered 401 for a replaced session");
            }
            return Err(FiscozenError::SessionExpired);
        }

        let response = ProviderResponse::read(response).await?;
        debug!(status = response.status, len = response.body.len(), "Provider response");
        Ok(response)
    }
}
