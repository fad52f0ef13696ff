//! Outcomes the dispatcher hands back for the host to apply.

/// What to do with a player's initial server selection.
///
/// No connection exists yet at this point, so a refusal can only be a
/// disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerChoice {
    /// Let the requested server stand.
    Keep,
    /// Send the player to this server instead.
    Redirect(String),
    /// Disconnect the player, showing them this message.
    Disconnect(String),
}

/// What to do with an already-connected player's server switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectRuling {
    /// Let the move proceed.
    Allow,
    /// Send the player to this server instead.
    Redirect(String),
    /// Refuse this move; the player stays where they are.
    Deny,
    /// Disconnect the player, showing them this message.
    Disconnect(String),
}

/// Whether a command a player typed may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRuling {
    Allow,
    Deny,
}
