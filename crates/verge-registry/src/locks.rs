//! Per-identity serialization for check-then-write sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::Identity;

/// Hands out one async mutex per identity.
///
/// An access check is a read-RPC followed by a registry write; two such
/// sequences for the SAME identity (say, a push-triggered recheck racing
/// a fresh connection attempt) must not interleave, or the loser's write
/// silently clobbers the winner's. Callers acquire the identity's guard
/// before the check and hold it until the registry write lands.
/// Different identities never contend.
///
/// Entries are pruned opportunistically once nobody holds them, so the
/// map doesn't grow with every identity ever seen.
#[derive(Debug, Default)]
pub struct IdentityLocks {
    locks: Mutex<HashMap<Identity, Arc<AsyncMutex<()>>>>,
}

impl IdentityLocks {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the guard for an identity, waiting if another task
    /// holds it.
    pub async fn acquire(&self, identity: &Identity) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            // Drop table entries no guard references any more.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(
                locks
                    .entry(identity.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of identities currently tracked (held or awaited).
    pub fn tracked(&self) -> usize {
        let mut locks =
            self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, l| Arc::strong_count(l) > 1);
        locks.len()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    fn alice() -> Identity {
        Identity::new("alice", "1.2.3.4")
    }

    #[tokio::test]
    async fn test_acquire_same_identity_serializes_critical_sections() {
        let locks = Arc::new(IdentityLocks::new());
        let in_flight = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_flight = Arc::clone(&in_flight);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&alice()).await;
                // Exactly one task may be here at a time.
                assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_acquire_distinct_identities_do_not_block() {
        let locks = IdentityLocks::new();

        // Holding alice's guard must not stop bob's acquisition.
        let _alice_guard = locks.acquire(&alice()).await;
        let bob = Identity::new("bob", "5.6.7.8");
        let acquired = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&bob),
        )
        .await;

        assert!(acquired.is_ok(), "distinct identity should not contend");
    }

    #[tokio::test]
    async fn test_tracked_prunes_released_identities() {
        let locks = IdentityLocks::new();

        {
            let _guard = locks.acquire(&alice()).await;
            assert_eq!(locks.tracked(), 1);
        }

        // Guard dropped — the table entry should age out.
        assert_eq!(locks.tracked(), 0);
    }
}
