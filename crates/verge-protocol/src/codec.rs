//! Codec trait and implementations for the bridge wire format.
//!
//! The bridge client doesn't care how envelopes become bytes — it asks
//! something implementing [`Codec`]. Today that is [`JsonCodec`]; the
//! contract is JSON text frames, and keeping the seam here means a
//! binary codec could slot in without touching the client.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between wire types and raw bytes.
///
/// `Send + Sync + 'static` because the bridge client shares its codec
/// across the call connection and the long-lived subscription task.
/// `decode` takes `DeserializeOwned` so the result never borrows the
/// incoming frame buffer.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// truncated, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// JSON is what the access-service contract specifies, and it keeps
/// frames inspectable in logs and packet captures while debugging a
/// misbehaving backend.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{BridgeResponse, Envelope, Payload};

    #[test]
    fn test_json_codec_envelope_round_trip() {
        let codec = JsonCodec;
        let envelope = Envelope {
            seq: 3,
            payload: Payload::Response(BridgeResponse::SubscribeAck),
        };

        let bytes = codec.encode(&envelope).unwrap();
        let decoded: Envelope = codec.decode(&bytes).unwrap();

        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let codec = JsonCodec;
        let result: Result<Envelope, _> = codec.decode(b"\xff\xfe");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
