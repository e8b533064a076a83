//! Fiscozen session establishment.
//!
//! The provider only exposes a browser-oriented API, so logging in means
//! replaying what its web app does:
//!
//! 1. GET an unauthenticated landing page to receive the `csrftoken` cookie
//! 2. POST the credentials to the login endpoint with that token in the
//!    `X-CSRFToken` header and every landing cookie in `Cookie`
//! 3. keep the landing cookies plus whatever the login response sets
//!
//! When no CSRF cookie is issued, a direct login without the header is
//! attempted; a token in its body is enough to synthesize a session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fiscorelay_core::{
    mask_email, truncate_secret, EventSink, LoginMethod, ProviderSession, WorkflowEvent,
};
use fiscorelay_fetch::{find_cookie_value, CookieHeader, HttpClient, LandingProbe, ProbeError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::error::FiscozenError;
use super::parser::{parse_login_token, provider_message};
use super::settings::{FiscozenSettings, LOGIN_ENDPOINT};
use super::store::CredentialStore;

/// Name of the CSRF cookie.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Prefix of markers for sessions obtained through the direct-login fallback.
const DIRECT_TOKEN_PREFIX: &str = "fiscozen-";

/// Prefix of markers for cookie sessions.
const SESSION_MARKER_PREFIX: &str = "session-";

// ============================================================================
// Credentials
// ============================================================================

/// Provider login credentials.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    /// Account e-mail.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Returns true when both fields are filled.
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &mask_email(&self.email))
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginBody<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            email: &credentials.email,
            password: &credentials.password,
        }
    }
}

// ============================================================================
// Login Outcome
// ============================================================================

/// What a successful login hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    /// Opaque session marker.
    pub token: String,
    /// How the session was obtained.
    pub method: LoginMethod,
    /// When the session expires.
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Session Establisher
// ============================================================================

/// Performs the CSRF bootstrap and login handshake.
#[derive(Debug, Clone)]
pub struct SessionEstablisher {
    http: HttpClient,
    settings: Arc<FiscozenSettings>,
}

impl SessionEstablisher {
    /// Creates an establisher.
    pub fn new(http: HttpClient, settings: Arc<FiscozenSettings>) -> Self {
        Self { http, settings }
    }

    /// Logs in and stores the resulting session in `store`.
    ///
    /// A failed login leaves `store` untouched.
    #[instrument(skip(self, credentials, store, sink), fields(email = %mask_email(&credentials.email)))]
    pub async fn login(
        &self,
        credentials: &Credentials,
        store: &CredentialStore,
        sink: &dyn EventSink,
    ) -> Result<LoginOutcome, FiscozenError> {
        if !credentials.is_complete() {
            debug!("Missing credentials");
            return Err(FiscozenError::InvalidCredentials);
        }

        let email = mask_email(&credentials.email);
        sink.observe(&WorkflowEvent::LoginAttempted {
            email: email.clone(),
        });

        let result = self.handshake(credentials, sink).await;
        match result {
            Ok(session) => {
                let outcome = LoginOutcome {
                    token: session.marker.clone(),
                    method: if session.has_csrf() {
                        LoginMethod::CsrfSession
                    } else {
                        LoginMethod::DirectToken
                    },
                    expires_at: session.expires_at,
                };
                store.set(session);
                info!(method = outcome.method.as_str(), "Provider login successful");
                sink.observe(&WorkflowEvent::LoginSucceeded {
                    email,
                    method: outcome.method,
                });
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Provider login failed");
                sink.observe(&WorkflowEvent::LoginFailed {
                    email,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn handshake(
        &self,
        credentials: &Credentials,
        sink: &dyn EventSink,
    ) -> Result<ProviderSession, FiscozenError> {
        let probe = LandingProbe::new(self.settings.landing_paths.clone())
            .with_retry(self.settings.landing_retry())
            .with_headers(self.settings.landing_headers()?);

        let hit = match probe.run(&self.http).await {
            Ok(hit) => hit,
            Err(ProbeError::AllCandidatesFailed { attempts }) => {
                for attempt in &attempts {
                    report_candidate(sink, &attempt.path, attempt.error.as_deref());
                }
                return Err(FiscozenError::ProviderUnreachable(format!(
                    "no landing page answered after {} attempts",
                    attempts.len()
                )));
            }
            Err(e @ ProbeError::NoCandidates) => {
                return Err(FiscozenError::ProviderUnreachable(e.to_string()));
            }
        };

        for failure in hit.failures() {
            report_candidate(sink, &failure.path, failure.error.as_deref());
        }

        let mut cookies = CookieHeader::from_set_cookies(&hit.set_cookies);
        let Some(csrf) = find_cookie_value(&hit.set_cookies, CSRF_COOKIE) else {
            warn!(path = %hit.path, "No CSRF cookie issued, trying direct login");
            return self.direct_login(credentials, &cookies).await;
        };

        debug!(
            path = %hit.path,
            csrf = %truncate_secret(&csrf),
            cookies = cookies.len(),
            "CSRF cookie obtained"
        );

        let headers = self
            .settings
            .xhr_headers(None, &cookies.as_header(), Some(&csrf))?;

        let response = self
            .http
            .post_json_with_headers(LOGIN_ENDPOINT, &LoginBody::from(credentials), headers)
            .await
            .map_err(|e| FiscozenError::ProviderUnreachable(e.to_string()))?;

        let status = response.status().as_u16();
        let set_cookies = fiscorelay_fetch::set_cookie_headers(response.headers());

        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(FiscozenError::AuthenticationRejected {
                status,
                message: provider_message(&body).unwrap_or_else(|| "Invalid credentials".to_string()),
            });
        }

        cookies.append_set_cookies(&set_cookies);
        let marker = format!("{SESSION_MARKER_PREFIX}{}", uuid::Uuid::new_v4());
        debug!(
            cookies = cookies.len(),
            marker = %truncate_secret(&marker),
            "Session cookies collected"
        );

        Ok(ProviderSession::new(
            cookies.as_header(),
            csrf,
            marker,
            self.settings.session_ttl,
        ))
    }

    async fn direct_login(
        &self,
        credentials: &Credentials,
        cookies: &CookieHeader,
    ) -> Result<ProviderSession, FiscozenError> {
        let headers = self.settings.api_headers(None)?;
        let response = match self
            .http
            .post_json_with_headers(LOGIN_ENDPOINT, &LoginBody::from(credentials), headers)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Direct login unreachable");
                return Err(FiscozenError::CsrfUnavailable);
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(status = %status, "Direct login rejected");
            return Err(FiscozenError::CsrfUnavailable);
        }

        let Some(token) = parse_login_token(&body) else {
            warn!("Direct login returned no token");
            return Err(FiscozenError::CsrfUnavailable);
        };

        debug!(token = %truncate_secret(&token), "Direct login token received");
        Ok(ProviderSession::new(
            cookies.as_header(),
            String::new(),
            format!("{DIRECT_TOKEN_PREFIX}{token}"),
            self.settings.session_ttl,
        ))
    }
}

fn report_candidate(sink: &dyn EventSink, path: &str, error: Option<&str>) {
    sink.observe(&WorkflowEvent::LandingCandidateFailed {
        path: path.to_string(),
        reason: error.unwrap_or("unknown").to_string(),
    });
}
