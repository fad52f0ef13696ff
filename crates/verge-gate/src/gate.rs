//! The connection gate: admission decisions at the two choke points.
//!
//! The host invokes this (through the dispatcher) when a player picks
//! their initial server and again before every server switch. Both
//! paths share one evaluation; they differ only in what a refusal
//! means — with no connection yet, refusal is a disconnect; for a
//! connected player it denies just the one move.

use std::sync::Arc;

use verge_bridge::{AccessBridge, AccessQuery};
use verge_protocol::AccessDecision;
use verge_registry::{
    Identity, IdentityLocks, PendingVerification, VerificationRegistry,
};

use crate::{
    ConnectRuling, GateSettings, ProxyHost, ServerChoice,
};

/// Shared result of one access evaluation, before it is mapped onto
/// the hook-specific outcome.
enum Evaluation {
    /// Connection may proceed to the requested server.
    Proceed,
    /// Player was parked; redirect them to the holding area.
    Park,
    /// The service said no (or violated the contract); refuse the
    /// destination.
    Refuse,
    /// We couldn't get an answer; never grant access under uncertainty.
    FailClosed,
}

/// Decides whether a connection attempt may reach its destination.
pub struct ConnectionGate<H: ProxyHost, B: AccessBridge> {
    host: Arc<H>,
    bridge: Arc<B>,
    registry: Arc<VerificationRegistry>,
    locks: Arc<IdentityLocks>,
    settings: Arc<GateSettings>,
}

impl<H: ProxyHost, B: AccessBridge> ConnectionGate<H, B> {
    /// Creates a gate over the shared registry and bridge.
    pub fn new(
        host: Arc<H>,
        bridge: Arc<B>,
        registry: Arc<VerificationRegistry>,
        locks: Arc<IdentityLocks>,
        settings: Arc<GateSettings>,
    ) -> Self {
        Self {
            host,
            bridge,
            registry,
            locks,
            settings,
        }
    }

    /// Rules on a player's initial server selection.
    pub async fn initial_server_select(
        &self,
        username: &str,
        ip: &str,
        requested: &str,
    ) -> ServerChoice {
        match self.evaluate(username, ip, requested).await {
            Evaluation::Proceed => ServerChoice::Keep,
            Evaluation::Park => ServerChoice::Redirect(
                self.settings.holding_server.clone(),
            ),
            // No connection exists yet; refusing means disconnecting.
            Evaluation::Refuse | Evaluation::FailClosed => {
                ServerChoice::Disconnect(
                    self.settings.denial_message.clone(),
                )
            }
        }
    }

    /// Rules on an already-connected player's move to another server.
    pub async fn pre_connect(
        &self,
        username: &str,
        ip: &str,
        requested: &str,
    ) -> ConnectRuling {
        match self.evaluate(username, ip, requested).await {
            Evaluation::Proceed => ConnectRuling::Allow,
            Evaluation::Park => ConnectRuling::Redirect(
                self.settings.holding_server.clone(),
            ),
            // Deny just this move; the player keeps their current
            // connection.
            Evaluation::Refuse => ConnectRuling::Deny,
            Evaluation::FailClosed => ConnectRuling::Disconnect(
                self.settings.denial_message.clone(),
            ),
        }
    }

    async fn evaluate(
        &self,
        username: &str,
        ip: &str,
        requested: &str,
    ) -> Evaluation {
        // Joining the holding area itself is always allowed; gating it
        // would recurse on our own redirects.
        if requested == self.settings.holding_server {
            return Evaluation::Proceed;
        }

        let identity = Identity::new(username, ip);
        tracing::info!(
            %identity,
            server = requested,
            "player is trying to join server"
        );

        // Hold this identity's guard across the check and the registry
        // write, so a concurrent re-check of the same identity can't
        // interleave.
        let _guard = self.locks.acquire(&identity).await;

        let reply = match self
            .bridge
            .check_access(AccessQuery {
                username: username.to_string(),
                ip: ip.to_string(),
                server: requested.to_string(),
                proxy_id: self.settings.proxy_id.clone(),
            })
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    %identity,
                    error = %e,
                    "access check failed, failing closed"
                );
                return Evaluation::FailClosed;
            }
        };

        match reply.decision() {
            Ok(AccessDecision::Allowed) => Evaluation::Proceed,
            Ok(AccessDecision::Prohibited) => {
                tracing::warn!(
                    %identity,
                    server = requested,
                    "player is prohibited from joining server"
                );
                Evaluation::Refuse
            }
            Ok(AccessDecision::RequiresVerification {
                verification_url,
            }) => {
                if !self.host.has_server(&self.settings.holding_server) {
                    tracing::warn!(
                        %identity,
                        holding_server = %self.settings.holding_server,
                        "holding-area server does not exist, denying"
                    );
                    return Evaluation::FailClosed;
                }

                // Remember the ORIGINAL destination, not the holding
                // area, so promotion can send them where they wanted.
                self.registry.insert(
                    identity.clone(),
                    PendingVerification::new(verification_url, requested),
                );
                tracing::info!(
                    %identity,
                    server = requested,
                    holding_server = %self.settings.holding_server,
                    "parking player pending verification"
                );
                Evaluation::Park
            }
            Err(e) => {
                // Contract violation (e.g. verification required but no
                // URL). Treat as prohibited — never park a player
                // without a usable link.
                tracing::error!(
                    %identity,
                    error = %e,
                    "protocol violation in access reply, denying"
                );
                Evaluation::Refuse
            }
        }
    }
}
