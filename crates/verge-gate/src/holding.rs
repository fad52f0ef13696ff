//! Holding-area lifecycle: reminders, containment, cleanup.

use std::sync::Arc;

use verge_registry::{Identity, ReminderTimers, VerificationRegistry};

use crate::{CommandRuling, GateSettings, ProxyHost};

/// Manages players while they are parked in the holding area.
pub struct HoldingAreaMonitor<H: ProxyHost> {
    host: Arc<H>,
    registry: Arc<VerificationRegistry>,
    timers: Arc<ReminderTimers>,
    settings: Arc<GateSettings>,
}

impl<H: ProxyHost> HoldingAreaMonitor<H> {
    /// Creates a monitor over the shared registry and timer table.
    pub fn new(
        host: Arc<H>,
        registry: Arc<VerificationRegistry>,
        timers: Arc<ReminderTimers>,
        settings: Arc<GateSettings>,
    ) -> Self {
        Self {
            host,
            registry,
            timers,
            settings,
        }
    }

    /// A player finished connecting to `server`.
    ///
    /// If that was the holding area, start their repeating reminder —
    /// the first link goes out immediately, then every
    /// `reminder_interval`. The timer only starts once the player has
    /// physically landed; a redirect alone doesn't count.
    pub fn server_connected(&self, username: &str, ip: &str, server: &str) {
        if server != self.settings.holding_server {
            return;
        }

        let identity = Identity::new(username, ip);
        let Some(entry) = self.registry.get(&identity) else {
            tracing::warn!(
                %identity,
                "connected to holding area but no pending verification \
                 entry was found"
            );
            return;
        };

        let host = Arc::clone(&self.host);
        let interval = self.settings.reminder_interval;
        let text = self.settings.reminder_text.clone();
        let url = entry.verification_url;
        let player = username.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                host.send_link_message(&player, &text, &url);
            }
        });
        self.timers.register(identity, handle);
    }

    /// A player was kicked from `server`.
    ///
    /// A kick from the holding area means the parking spot itself
    /// failed; there is nowhere safe left, so disconnect.
    pub fn kicked_from(&self, username: &str, server: &str) {
        if server != self.settings.holding_server {
            return;
        }
        tracing::warn!(
            player = username,
            server,
            "holding-area connection failed, disconnecting player"
        );
        self.host
            .disconnect(username, &self.settings.denial_message);
    }

    /// A player disconnected, for any reason.
    ///
    /// Runs unconditionally so no path — quit, kick, crash, promotion
    /// mid-flight — can leak a timer or a stale entry.
    pub fn player_disconnected(&self, username: &str, ip: &str) {
        let identity = Identity::new(username, ip);
        let cancelled = self.timers.cancel(&identity);
        let removed = self.registry.remove(&identity).is_some();
        if cancelled || removed {
            tracing::info!(
                %identity,
                "cleared pending verification on disconnect"
            );
        }
    }

    /// A player tried to run a command. Denied while parked.
    ///
    /// Containment is cosmetic — it keeps the holding area quiet, it
    /// is not a security boundary.
    pub fn command_executed(
        &self,
        username: &str,
        command: &str,
    ) -> CommandRuling {
        if self.is_parked(username) {
            tracing::info!(
                player = username,
                command,
                "denied command while in holding area"
            );
            CommandRuling::Deny
        } else {
            CommandRuling::Allow
        }
    }

    /// Whether the player's available-command list should be emptied.
    pub fn clears_available_commands(&self, username: &str) -> bool {
        if self.is_parked(username) {
            tracing::info!(
                player = username,
                "clearing available commands while in holding area"
            );
            true
        } else {
            false
        }
    }

    fn is_parked(&self, username: &str) -> bool {
        self.host
            .player(username)
            .and_then(|p| p.current_server)
            .is_some_and(|s| s == self.settings.holding_server)
    }
}
