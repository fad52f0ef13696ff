//! The dispatcher: named hooks the host proxy invokes.
//!
//! The host's own event bus stays on the host's side of the fence.
//! It registers plain callbacks that forward into these methods and
//! applies the returned outcomes (redirect, deny, disconnect). Hooks
//! for different players may be invoked concurrently; everything
//! reachable from here is share-safe.

use verge_bridge::AccessBridge;

use crate::{
    CommandRuling, ConnectRuling, ConnectionGate, HoldingAreaMonitor,
    ProxyHost, ServerChoice,
};

/// The full set of host-facing hooks.
pub struct Dispatcher<H: ProxyHost, B: AccessBridge> {
    gate: ConnectionGate<H, B>,
    monitor: HoldingAreaMonitor<H>,
}

impl<H: ProxyHost, B: AccessBridge> Dispatcher<H, B> {
    /// Wires the hooks to the gate and monitor.
    pub fn new(
        gate: ConnectionGate<H, B>,
        monitor: HoldingAreaMonitor<H>,
    ) -> Self {
        Self { gate, monitor }
    }

    /// Hook: a player is choosing their initial server.
    pub async fn initial_server_select(
        &self,
        username: &str,
        ip: &str,
        requested: &str,
    ) -> ServerChoice {
        self.gate
            .initial_server_select(username, ip, requested)
            .await
    }

    /// Hook: a connected player is about to switch servers.
    pub async fn pre_connect(
        &self,
        username: &str,
        ip: &str,
        requested: &str,
    ) -> ConnectRuling {
        self.gate.pre_connect(username, ip, requested).await
    }

    /// Hook: a player finished connecting to a server.
    pub fn server_connected(
        &self,
        username: &str,
        ip: &str,
        server: &str,
    ) {
        self.monitor.server_connected(username, ip, server);
    }

    /// Hook: a player was kicked from a server.
    pub fn kicked_from_server(&self, username: &str, server: &str) {
        self.monitor.kicked_from(username, server);
    }

    /// Hook: a player disconnected from the proxy.
    pub fn player_disconnected(&self, username: &str, ip: &str) {
        self.monitor.player_disconnected(username, ip);
    }

    /// Hook: a player is executing a command.
    pub fn command_executed(
        &self,
        username: &str,
        command: &str,
    ) -> CommandRuling {
        self.monitor.command_executed(username, command)
    }

    /// Hook: the proxy is about to send a player their available
    /// commands. `true` means send an empty set.
    pub fn clears_available_commands(&self, username: &str) -> bool {
        self.monitor.clears_available_commands(username)
    }
}
