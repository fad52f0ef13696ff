//! Capped exponential backoff for registration retries.

use std::time::Duration;

/// Produces the retry-delay sequence 1, 2, 4, … doubling up to a cap.
///
/// The sequence never resets on its own — a fresh `Backoff` is built
/// after each success, so only success resets the schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    cap: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `initial` and doubling up to `cap`.
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            next: initial.min(cap),
            cap,
        }
    }

    /// The registration schedule: 1 s doubling to a 60 s cap
    /// (1, 2, 4, 8, 16, 32, 60, 60, …).
    pub fn registration() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }

    /// Returns the next delay and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.cap);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay_registration_sequence_is_exact() {
        // 1, 2, 4, 8, 16, 32, then pinned at the 60 s cap.
        let mut backoff = Backoff::registration();
        let secs: Vec<u64> =
            (0..9).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 60, 60, 60]);
    }

    #[test]
    fn test_new_fresh_instance_restarts_schedule() {
        // Only constructing a new backoff (i.e. after a success)
        // resets the delays.
        let mut first = Backoff::registration();
        for _ in 0..5 {
            first.next_delay();
        }

        let mut second = Backoff::registration();
        assert_eq!(second.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_new_initial_above_cap_is_clamped() {
        let mut backoff = Backoff::new(
            Duration::from_secs(120),
            Duration::from_secs(60),
        );
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }
}
