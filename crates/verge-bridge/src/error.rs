//! Error types for the bridge client.

use std::time::Duration;

use verge_protocol::ProtocolError;

/// Errors that can occur while talking to the access service.
///
/// Every variant is recoverable from the process's point of view:
/// access checks fail closed, registration retries, the push stream
/// resubscribes.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Dialing the access service failed.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// A call failed mid-flight (send or receive).
    #[error("call failed: {0}")]
    Call(#[source] std::io::Error),

    /// The call's deadline expired before a reply arrived.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The access service closed the connection.
    #[error("connection closed by access service")]
    Closed,

    /// The access service answered with an explicit error.
    #[error("rejected by access service: {0}")]
    Rejected(String),

    /// The client has been shut down; no further calls are accepted.
    #[error("bridge client is shut down")]
    Shutdown,

    /// A second push subscription was requested; only one may exist.
    #[error("push subscription already active")]
    AlreadySubscribed,

    /// An encode/decode/contract failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
