//! Settings shared by the decision components.

use std::time::Duration;

/// What the gate, monitor, and push processor need to know.
///
/// The meta crate derives this from the host-supplied configuration;
/// nothing here is loaded from disk by this crate.
#[derive(Debug, Clone)]
pub struct GateSettings {
    /// This proxy's identifier, sent with every access check.
    pub proxy_id: String,
    /// Name of the holding-area server unverified players are parked on.
    pub holding_server: String,
    /// The one message players ever see on denial. No internal detail
    /// leaks through it.
    pub denial_message: String,
    /// How often a parked player is re-sent their verification link.
    pub reminder_interval: Duration,
    /// The text of the reminder; the host renders it with the link
    /// attached.
    pub reminder_text: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            proxy_id: String::new(),
            holding_server: String::new(),
            denial_message: "You are not whitelisted on this server!"
                .to_string(),
            reminder_interval: Duration::from_secs(10),
            reminder_text: "Click here to verify your account."
                .to_string(),
        }
    }
}
