//! Provider session credentials.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::events::truncate_secret;

/// Default lifetime of a provider session.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Cookie/CSRF credentials for the provider's browser-oriented web API.
///
/// `cookie_header` is re-sent verbatim as the `Cookie` header: semicolon-space
/// joined `name=value` pairs, in the order they were received. Duplicate
/// names are kept.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSession {
    /// Full `Cookie` header value.
    pub cookie_header: String,
    /// CSRF token, empty when the session came from the direct-token login.
    pub csrf_token: String,
    /// Opaque marker handed back to the caller on login.
    pub marker: String,
    /// When the session was established.
    pub created_at: DateTime<Utc>,
    /// When the session stops being usable.
    pub expires_at: DateTime<Utc>,
}

impl ProviderSession {
    /// Creates a session starting now and lasting `ttl`.
    pub fn new(
        cookie_header: impl Into<String>,
        csrf_token: impl Into<String>,
        marker: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            cookie_header: cookie_header.into(),
            csrf_token: csrf_token.into(),
            marker: marker.into(),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// Returns true if the session is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Returns true if the session is still usable.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Returns true if a CSRF token accompanies the cookies.
    pub fn has_csrf(&self) -> bool {
        !self.csrf_token.is_empty()
    }
}

impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("cookie_header", &truncate_secret(&self.cookie_header))
            .field("csrf_token", &truncate_secret(&self.csrf_token))
            .field("marker", &truncate_secret(&self.marker))
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_valid() {
        let session = ProviderSession::new(
            "csrftoken=ABC123",
            "ABC123",
            "session-1",
            Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        );
        assert!(session.is_valid());
        assert!(session.has_csrf());
        assert_eq!(session.expires_at - session.created_at, Duration::hours(24));
    }

    #[test]
    fn test_expired_session() {
        let session = ProviderSession::new("a=b", "", "m", Duration::hours(1));
        assert!(!session.is_valid_at(session.expires_at));
        assert!(!session.is_valid_at(session.expires_at + Duration::seconds(1)));
        assert!(session.is_valid_at(session.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let session = ProviderSession::new(
            "sessionid=supersecretvalue; csrftoken=ABCDEFGHIJKLMNOP",
            "ABCDEFGHIJKLMNOP",
            "session-0123456789",
            Duration::hours(1),
        );
        let debug = format!("{session:?}");
        assert!(!debug.contains("supersecretvalue"));
        assert!(!debug.contains("ABCDEFGHIJKLMNOP"));
    }
}
