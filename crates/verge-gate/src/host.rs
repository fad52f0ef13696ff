//! The seam between the gateway and the host proxy runtime.
//!
//! Verge doesn't talk to players itself — the host proxy does. This
//! trait is the narrow waist: lookups the decision logic needs, and the
//! fire-and-forget player actions it triggers. Production wires in an
//! adapter over the real proxy runtime; tests wire in a scripted host.

/// A point-in-time view of one connected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// The player's username.
    pub username: String,
    /// The remote IP address they connected from.
    pub ip: String,
    /// The backend server they are currently on, if any. `None` while
    /// a connection is still being negotiated.
    pub current_server: Option<String>,
}

/// What the host proxy runtime provides to the gateway.
///
/// `Send + Sync + 'static` because every component shares the host
/// behind an `Arc` across concurrently running hooks and push workers.
///
/// The action methods are fire-and-forget: the gateway never awaits
/// their effect. A later hook invocation (server-connected, kicked,
/// disconnect) reports what actually happened.
pub trait ProxyHost: Send + Sync + 'static {
    /// Names of all servers this proxy fronts.
    fn server_names(&self) -> Vec<String>;

    /// Whether a server with this name is configured.
    fn has_server(&self, name: &str) -> bool;

    /// Snapshots of every connected player.
    fn players(&self) -> Vec<PlayerSnapshot>;

    /// Snapshot of one player by username, if connected.
    fn player(&self, username: &str) -> Option<PlayerSnapshot>;

    /// Disconnects a player, showing them `message`.
    fn disconnect(&self, username: &str, message: &str);

    /// Asks the proxy to move a player to `server`. Fire-and-forget; a
    /// later server-connected or kicked hook reports the result.
    fn request_connect(&self, username: &str, server: &str);

    /// Sends the player a chat message with `url` attached as a
    /// clickable link.
    fn send_link_message(&self, username: &str, text: &str, url: &str);
}
