//! The verification registry: all players currently awaiting verification.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::{Identity, PendingVerification};

/// Concurrency-safe map of [`Identity`] → [`PendingVerification`].
///
/// This is the single shared piece of state between the connection gate,
/// the holding-area monitor, the push-event processor, and disconnect
/// cleanup. Each operation is atomic; lookups hand out clones, so no
/// caller ever holds a reference into the map after its entry is removed.
///
/// ## Invariant
///
/// At most one entry per identity. `insert` replaces (and returns) any
/// previous entry rather than stacking a second one.
#[derive(Debug, Default)]
pub struct VerificationRegistry {
    entries: Mutex<HashMap<Identity, PendingVerification>>,
}

impl VerificationRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) the entry for an identity.
    ///
    /// Returns the previous entry if one existed — callers that care
    /// about a stale entry's timer can clean it up.
    pub fn insert(
        &self,
        identity: Identity,
        pending: PendingVerification,
    ) -> Option<PendingVerification> {
        let mut entries = self.lock();
        let previous = entries.insert(identity.clone(), pending);
        if previous.is_some() {
            tracing::debug!(%identity, "replaced pending verification");
        } else {
            tracing::debug!(%identity, "pending verification recorded");
        }
        previous
    }

    /// Returns a copy of the entry for an identity, if present.
    pub fn get(&self, identity: &Identity) -> Option<PendingVerification> {
        self.lock().get(identity).cloned()
    }

    /// Removes and returns the entry for an identity.
    pub fn remove(
        &self,
        identity: &Identity,
    ) -> Option<PendingVerification> {
        let removed = self.lock().remove(identity);
        if removed.is_some() {
            tracing::debug!(%identity, "pending verification removed");
        }
        removed
    }

    /// Whether an entry exists for this identity.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.lock().contains_key(identity)
    }

    /// Number of players currently awaiting verification.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nobody is awaiting verification.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<Identity, PendingVerification>>
    {
        // A panic while holding this lock leaves plain data in a valid
        // state, so recover the guard instead of propagating poison.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =========================================================================
// Tests
// =========================================================================
