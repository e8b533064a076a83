//! Credential store for one caller's provider session.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use fiscorelay_core::ProviderSession;
use tracing::debug;

// ============================================================================
// Credential Store
// ============================================================================

/// Holds at most one [`ProviderSession`].
///
/// Reads hand out clones, so a request in flight keeps the credentials it
/// started with even if the slot is cleared or replaced meanwhile.
#[derive(Debug, Default)]
pub struct CredentialStore {
    slot: RwLock<Option<ProviderSession>>,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true iff a session is present and not expired.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Returns true iff a session is present and valid at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|s| s.is_valid_at(now))
    }

    /// Stores a session, replacing any previous one.
    pub fn set(&self, session: ProviderSession) {
        debug!(expires_at = %session.expires_at, "Storing provider session");
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Drops the stored session. Returns true if there was one.
    pub fn clear(&self) -> bool {
        let previous = self.slot.write().unwrap_or_else(PoisonError::into_inner).take();
        if previous.is_some() {
            debug!("Provider session cleared");
        }
        previous.is_some()
    }

    /// Drops the stored session only if it is the one identified by
    /// `marker`. Returns true if it was dropped.
    ///
    /// A session stored by a newer login survives a rejection of a
    /// request sent with older credentials.
    pub fn clear_if(&self, marker: &str) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|s| s.marker == marker) {
            *slot = None;
            debug!("Provider session cleared");
            true
        } else {
            false
        }
    }

    /// Returns the session if it is still valid.
    pub fn current(&self) -> Option<ProviderSession> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|s| s.is_valid())
            .cloned()
    }

    /// Returns the expiry of the stored session, valid or not.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(ttl: Duration) -> ProviderSession {
        ProviderSession::new("csrftoken=ABC123", "ABC123", "session-1", ttl)
    }

    #[test]
    fn test_empty_store_is_invalid() {
        let store = CredentialStore::new();
        assert!(!store.is_valid());
        assert!(store.current().is_none());
        assert!(!store.clear());
    }

    #[test]
    fn test_set_then_clear() {
        let store = CredentialStore::new();
        store.set(session(Duration::hours(24)));
        assert!(store.is_valid());
        assert_eq!(store.current().unwrap().csrf_token, "ABC123");

        assert!(store.clear());
        assert!(!store.is_valid());
    }

    #[test]
    fn test_clear_if_spares_a_newer_session() {
        let store = CredentialStore::new();
        store.set(session(Duration::hours(24)));
        let stale = store.current().unwrap();

        store.set(ProviderSession::new("sessionid=S2", "NEW", "session-2", Duration::hours(24)));
        assert!(!store.clear_if(&stale.marker));
        assert_eq!(store.current().unwrap().marker, "session-2");

        assert!(store.clear_if("session-2"));
        assert!(!store.is_valid());
    }

    #[test]
    fn test_expired_session_is_not_current() {
        let store = CredentialStore::new();
        store.set(session(Duration::seconds(-1)));
        assert!(!store.is_valid());
        assert!(store.current().is_none());
        assert!(store.expires_at().is_some());
    }

    #[test]
    fn test_validity_boundary() {
        let store = CredentialStore::new();
        let s = session(Duration::hours(24));
        let expires = s.expires_at;
        store.set(s);
        assert!(store.is_valid_at(expires - Duration::seconds(1)));
        assert!(!store.is_valid_at(expires));
    }
}
