//! Per-caller session management.
//!
//! Every logical caller (a user, a tenant, a CLI profile) gets its own
//! [`CredentialStore`], so one caller's login or 401 never touches another
//! caller's credentials. Logins for the same caller are serialized.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::CredentialStore;

/// Key used when the process serves a single caller.
pub const DEFAULT_CALLER: &str = "default";

// ============================================================================
// Caller Key
// ============================================================================

/// Identifies the logical owner of a provider session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerKey(String);

impl CallerKey {
    /// Creates a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallerKey {
    fn default() -> Self {
        Self::new(DEFAULT_CALLER)
    }
}

impl fmt::Display for CallerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallerKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CallerKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

// ============================================================================
// Session Manager
// ============================================================================

#[derive(Debug, Default)]
struct CallerSlot {
    store: Arc<CredentialStore>,
    login: Arc<tokio::sync::Mutex<()>>,
}

/// Owns one credential store per caller.
#[derive(Debug, Default)]
pub struct SessionManager {
    callers: Mutex<HashMap<CallerKey, CallerSlot>>,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slot<T>(&self, key: &CallerKey, f: impl FnOnce(&CallerSlot) -> T) -> T {
        let mut callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = callers.entry(key.clone()).or_insert_with(|| {
            debug!(caller = %key, "Creating credential store");
            CallerSlot::default()
        });
        f(slot)
    }

    /// Returns the caller's store, creating it on first use.
    pub fn store(&self, key: &CallerKey) -> Arc<CredentialStore> {
        self.with_slot(key, |slot| Arc::clone(&slot.store))
    }

    /// Returns the lock that serializes the caller's logins.
    pub fn login_lock(&self, key: &CallerKey) -> Arc<tokio::sync::Mutex<()>> {
        self.with_slot(key, |slot| Arc::clone(&slot.login))
    }

    /// Clears the caller's session. Returns true if one was stored.
    pub fn logout(&self, key: &CallerKey) -> bool {
        let callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
        callers.get(key).is_some_and(|slot| slot.store.clear())
    }

    /// Returns true if the caller holds a valid session.
    pub fn is_authenticated(&self, key: &CallerKey) -> bool {
        let callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
        callers.get(key).is_some_and(|slot| slot.store.is_valid())
    }

    /// Returns the callers known to this manager.
    pub fn callers(&self) -> Vec<CallerKey> {
        let callers = self.callers.lock().unwrap_or_else(PoisonError::into_inner);
        callers.keys().cloned().collect()
    }
}
