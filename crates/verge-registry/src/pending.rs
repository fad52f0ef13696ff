//! The per-identity record of an unresolved verification.

/// What the gateway remembers about a player parked in the holding area.
///
/// Created when the access service answers `REQUIRES_VERIFICATION`,
/// destroyed on promotion, revocation, or disconnect. The intended
/// destination is the server the player originally asked for — NOT the
/// holding area — so a later promotion can send them where they wanted
/// to go.
///
/// The reminder-task handle deliberately does not live here; see
/// [`ReminderTimers`](crate::ReminderTimers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    /// The link the player must visit to verify their account.
    pub verification_url: String,

    /// The server the player originally requested.
    pub intended_destination: String,
}

impl PendingVerification {
    /// Creates a record for a player being parked.
    pub fn new(
        verification_url: impl Into<String>,
        intended_destination: impl Into<String>,
    ) -> Self {
        Self {
            verification_url: verification_url.into(),
            intended_destination: intended_destination.into(),
        }
    }
}
