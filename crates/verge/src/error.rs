//! Unified error type for the Verge gateway.

use verge_bridge::BridgeError;
use verge_protocol::ProtocolError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// Hosts embedding the `verge` meta crate deal with this single type;
/// the `#[from]` attributes let `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum VergeError {
    /// A wire encode/decode/contract error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An RPC failure against the access service.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The host-supplied configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bridge_error() {
        let err: VergeError = BridgeError::Closed.into();
        assert!(matches!(err, VergeError::Bridge(_)));
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: VergeError =
            ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, VergeError::Protocol(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err: VergeError = ConfigError::MissingProxyId.into();
        assert!(matches!(err, VergeError::Config(_)));
    }
}
