//! Reminder-task bookkeeping, separated from the registry entries.
//!
//! Each parked player has one repeating reminder task. Storing the task
//! handle inside the registry entry would tangle timer lifecycle into
//! every map operation; keeping a dedicated table keyed by [`Identity`]
//! gives every cleanup path — promotion, revocation, disconnect — the
//! same idempotent `cancel` call, and makes "no timers outstanding"
//! directly auditable.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;

use crate::Identity;

/// Tracks the reminder task for each parked player.
#[derive(Debug, Default)]
pub struct ReminderTimers {
    tasks: Mutex<HashMap<Identity, JoinHandle<()>>>,
}

impl ReminderTimers {
    /// Creates an empty timer table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the reminder task for an identity.
    ///
    /// At most one timer per identity: if a task is already registered
    /// (a holding-area reconnect, say), the old one is aborted before
    /// the new handle takes its place.
    pub fn register(&self, identity: Identity, handle: JoinHandle<()>) {
        let previous = self.lock().insert(identity.clone(), handle);
        if let Some(previous) = previous {
            tracing::debug!(%identity, "replacing existing reminder task");
            previous.abort();
        }
    }

    /// Cancels the reminder task for an identity, if one exists.
    ///
    /// Idempotent: returns `true` if a task was actually cancelled,
    /// `false` if there was nothing to cancel.
    pub fn cancel(&self, identity: &Identity) -> bool {
        match self.lock().remove(identity) {
            Some(handle) => {
                handle.abort();
                tracing::debug!(%identity, "reminder task cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every registered reminder task. Used at shutdown.
    pub fn cancel_all(&self) {
        let mut tasks = self.lock();
        for (identity, handle) in tasks.drain() {
            tracing::debug!(%identity, "reminder task cancelled (shutdown)");
            handle.abort();
        }
    }

    /// Number of reminder tasks still alive.
    ///
    /// Prunes handles whose task already finished, so the count reflects
    /// genuinely outstanding timers.
    pub fn outstanding(&self) -> usize {
        let mut tasks = self.lock();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.len()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<Identity, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("alice", "1.2.3.4")
    }

    /// Spawns a task that runs until aborted.
    fn forever() -> JoinHandle<()> {
        tokio::spawn(std::future::pending())
    }

    #[tokio::test]
    async fn test_register_then_cancel_removes_timer() {
        let timers = ReminderTimers::new();
        timers.register(alice(), forever());
        assert_eq!(timers.outstanding(), 1);

        assert!(timers.cancel(&alice()));
        assert_eq!(timers.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_identity_is_noop() {
        let timers = ReminderTimers::new();
        assert!(!timers.cancel(&alice()));
    }

    #[tokio::test]
    async fn test_cancel_twice_is_idempotent() {
        let timers = ReminderTimers::new();
        timers.register(alice(), forever());

        assert!(timers.cancel(&alice()));
        assert!(!timers.cancel(&alice()), "second cancel must be a no-op");
    }

    #[tokio::test]
    async fn test_register_replaces_and_aborts_previous_task() {
        let timers = ReminderTimers::new();

        // The first task owns a oneshot sender; if the task is aborted
        // the sender drops and the receiver resolves with an error.
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let first = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await
        });
        timers.register(alice(), first);
        timers.register(alice(), forever());

        rx.await.expect_err("replaced task should have been aborted");
        assert_eq!(timers.outstanding(), 1);
        timers.cancel(&alice());
        assert_eq!(timers.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_clears_every_timer() {
        let timers = ReminderTimers::new();
        for i in 0..5 {
            timers.register(
                Identity::new(format!("player{i}"), "1.2.3.4"),
                forever(),
            );
        }
        assert_eq!(timers.outstanding(), 5);

        timers.cancel_all();
        assert_eq!(timers.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_outstanding_prunes_finished_tasks() {
        let timers = ReminderTimers::new();
        let done = tokio::spawn(async {});
        // Let the trivial task run to completion.
        tokio::task::yield_now().await;
        timers.register(alice(), done);

        // Give the runtime a beat to mark it finished.
        tokio::task::yield_now().await;
        assert_eq!(timers.outstanding(), 0);
    }
}
