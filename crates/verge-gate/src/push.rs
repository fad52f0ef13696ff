//! Push-event reconciliation: promote, demote, revoke.
//!
//! The access service pushes a notification whenever a player's
//! standing changes. The processor re-checks that one player and acts:
//! parked players get promoted (sent onward) or demoted (disconnected);
//! players on regular servers get revoked if they no longer pass. After
//! a stream outage is recovered, [`PushEventProcessor::reconcile_all`]
//! sweeps every connected player once, catching anything pushed while
//! the stream was down.

use std::sync::Arc;

use verge_bridge::{AccessBridge, AccessQuery};
use verge_protocol::{AccessStatus, EventPayload, ServerEvent};
use verge_registry::{
    Identity, IdentityLocks, ReminderTimers, VerificationRegistry,
};

use crate::{GateSettings, ProxyHost};

/// Consumes access-change notifications from the push stream.
pub struct PushEventProcessor<H: ProxyHost, B: AccessBridge> {
    host: Arc<H>,
    bridge: Arc<B>,
    registry: Arc<VerificationRegistry>,
    locks: Arc<IdentityLocks>,
    timers: Arc<ReminderTimers>,
    settings: Arc<GateSettings>,
}

impl<H: ProxyHost, B: AccessBridge> PushEventProcessor<H, B> {
    /// Creates a processor over the shared registry and timer table.
    pub fn new(
        host: Arc<H>,
        bridge: Arc<B>,
        registry: Arc<VerificationRegistry>,
        locks: Arc<IdentityLocks>,
        timers: Arc<ReminderTimers>,
        settings: Arc<GateSettings>,
    ) -> Self {
        Self {
            host,
            bridge,
            registry,
            locks,
            timers,
            settings,
        }
    }

    /// Handles one pushed event. Unrecognized payload kinds are
    /// ignored, not errors.
    pub async fn handle_event(&self, event: ServerEvent) {
        match event.payload {
            EventPayload::PlayerUpdate {
                player_name,
                player_ipv4,
            } => self.process_update(&player_name, &player_ipv4).await,
            EventPayload::Unknown => {
                tracing::debug!(
                    "ignoring unrecognized push event payload"
                );
            }
        }
    }

    async fn process_update(&self, name: &str, ip: &str) {
        tracing::info!(
            player = name,
            ip,
            "received player access notification"
        );

        // The notification must match a live player, byte for byte: a
        // missing player or a different actual IP means the event is
        // stale (or aimed at someone else behind the same name).
        let Some(player) = self.host.player(name) else {
            tracing::warn!(
                player = name,
                ip,
                "notified player not found on proxy"
            );
            return;
        };
        if player.ip != ip {
            tracing::warn!(
                player = name,
                expected = ip,
                actual = %player.ip,
                "IP mismatch on notification, dropping"
            );
            return;
        }
        let Some(current) = player.current_server else {
            tracing::warn!(
                player = name,
                ip,
                "notified player is not connected to any server"
            );
            return;
        };

        if current == self.settings.holding_server {
            self.recheck_parked(name, ip).await;
        } else {
            self.recheck_regular(name, ip, &current).await;
        }
    }

    /// Re-checks a parked player against their INTENDED destination.
    async fn recheck_parked(&self, name: &str, ip: &str) {
        let identity = Identity::new(name, ip);
        // Same guard the gate takes: the promotion below must not
        // interleave with a concurrent evaluation of this identity.
        let _guard = self.locks.acquire(&identity).await;

        let Some(entry) = self.registry.get(&identity) else {
            tracing::warn!(
                %identity,
                "player is in holding area but has no pending \
                 verification entry"
            );
            return;
        };
        let destination = entry.intended_destination;

        let Some(status) = self.check(name, ip, &destination).await
        else {
            return;
        };

        match status {
            AccessStatus::Allowed => {
                self.timers.cancel(&identity);
                self.registry.remove(&identity);
                tracing::info!(
                    %identity,
                    server = %destination,
                    "player verified, sending them onward"
                );
                self.host.request_connect(name, &destination);
            }
            AccessStatus::Prohibited => {
                self.timers.cancel(&identity);
                self.registry.remove(&identity);
                tracing::warn!(
                    %identity,
                    server = %destination,
                    "player is now prohibited, disconnecting"
                );
                self.host
                    .disconnect(name, &self.settings.denial_message);
            }
            AccessStatus::RequiresVerification => {
                tracing::debug!(
                    %identity,
                    server = %destination,
                    "player still requires verification"
                );
            }
        }
    }

    /// Re-checks a player on a regular server against that server.
    /// Anything but an explicit ALLOWED revokes them.
    async fn recheck_regular(&self, name: &str, ip: &str, server: &str) {
        let Some(status) = self.check(name, ip, server).await else {
            return;
        };

        if status == AccessStatus::Allowed {
            tracing::debug!(
                player = name,
                server,
                "player still has permission"
            );
        } else {
            tracing::warn!(
                player = name,
                server,
                ?status,
                "player no longer has permission, disconnecting"
            );
            self.host
                .disconnect(name, &self.settings.denial_message);
        }
    }

    /// Re-checks every connected player after the push stream recovers.
    ///
    /// Holding-area occupants are skipped — their own entries govern
    /// them. Per-player failures are logged and skipped; one bad check
    /// must not abort the sweep.
    pub async fn reconcile_all(&self) {
        tracing::info!(
            "checking access for all connected players after \
             reconnection"
        );

        let players = self.host.players();
        let total = players.len();
        for player in players {
            let Some(current) = player.current_server else {
                tracing::warn!(
                    player = %player.username,
                    "skipping player with no current server"
                );
                continue;
            };
            if current == self.settings.holding_server {
                tracing::debug!(
                    player = %player.username,
                    "skipping player in holding area"
                );
                continue;
            }
            self.recheck_regular(&player.username, &player.ip, &current)
                .await;
        }

        tracing::info!(
            players = total,
            "completed post-reconnection access sweep"
        );
    }

    /// One access check; `None` means the check itself failed and the
    /// event is dropped. Revocation needs a positive verdict — a
    /// backend outage must not mass-disconnect the proxy.
    async fn check(
        &self,
        name: &str,
        ip: &str,
        server: &str,
    ) -> Option<AccessStatus> {
        match self
            .bridge
            .check_access(AccessQuery {
                username: name.to_string(),
                ip: ip.to_string(),
                server: server.to_string(),
                proxy_id: self.settings.proxy_id.clone(),
            })
            .await
        {
            Ok(reply) => Some(reply.status),
            Err(e) => {
                tracing::error!(
                    player = name,
                    ip,
                    server,
                    error = %e,
                    "access check failed, dropping notification"
                );
                None
            }
        }
    }
}
