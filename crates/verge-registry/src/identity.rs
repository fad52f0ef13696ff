//! The composite key identifying a connection attempt.

use std::fmt;

/// Identifies a player connection by username AND remote IP.
///
/// Equality and hashing use both fields: the same account name arriving
/// from a different address is a different identity. This keeps shared
/// accounts (and players behind the same NAT) from colliding in the
/// verification queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    username: String,
    ip: String,
}

impl Identity {
    /// Creates an identity from a username and remote IP address.
    pub fn new(username: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ip: ip.into(),
        }
    }

    /// The player's username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The remote IP address the player connected from.
    pub fn ip(&self) -> &str {
        &self.ip
    }
}

/// Renders as `name (ip)` — the form every log line uses.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_new_same_fields_are_equal() {
        let a = Identity::new("alice", "1.2.3.4");
        let b = Identity::new("alice", "1.2.3.4");
        assert_eq!(a, b);
    }

    #[test]
    fn test_new_same_username_different_ip_are_distinct() {
        // The whole point of the composite key.
        let a = Identity::new("alice", "1.2.3.4");
        let b = Identity::new("alice", "5.6.7.8");
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_different_username_same_ip_are_distinct() {
        let a = Identity::new("alice", "1.2.3.4");
        let b = Identity::new("bob", "1.2.3.4");
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_hash_distinguishes_ip() {
        // Both fields must participate in hashing, not just the name.
        let mut map = HashMap::new();
        map.insert(Identity::new("alice", "1.2.3.4"), 1);
        map.insert(Identity::new("alice", "5.6.7.8"), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&Identity::new("alice", "1.2.3.4")], 1);
    }

    #[test]
    fn test_display_renders_name_and_ip() {
        let id = Identity::new("alice", "1.2.3.4");
        assert_eq!(id.to_string(), "alice (1.2.3.4)");
    }
}
