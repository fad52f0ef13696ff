//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or interpreting a
/// bridge message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed — malformed, truncated, or mistyped frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but violates the contract — e.g. a
    /// `REQUIRES_VERIFICATION` reply with no verification URL, or a
    /// response whose sequence number matches no outstanding call.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
